//! Serial link receiver: rebuilds frames from an unbounded, possibly noisy
//! byte stream, one byte at a time.
//!
//! The state machine is a strict pipeline `Sync → Header → Payload → Footer`
//! with a single way back to `Sync` from every state. When a candidate frame
//! is discarded (bad header, bad terminator, checksum failure) the bytes it
//! swallowed after its `SOH` are fed again from `Sync`, so a stray `SOH`
//! right before a real frame costs a drop report but not the frame. It never
//! blocks and keeps its cursor between calls, so a frame trickling in over
//! many polls is assembled exactly like one delivered in a single read.
//!
//! The payload buffer is owned by the `Payload`/`Footer` state variants.
//! Every transition back to `Sync` (frame delivered, checksum failure, bad
//! terminator, [`FrameReceiver::reset`]) drops it.
use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use crate::core::{
    Frame, FrameHeader, EOT, ETX, FOOTER_LEN, HEADER_LEN, PROTOCOL_VERSION, SOH, STX,
};
use crate::error::DropReason;
use crate::infra::codec::checksum::Checksum;
use crate::protocol::transport::DEFAULT_MAX_PAYLOAD;

//==================================================================================Enums and Structs
/// Outcome of feeding one byte to the receiver.
#[derive(Debug, PartialEq, Eq)]
pub enum ReceiveResult {
    /// Byte discarded while hunting for a start marker.
    Ignored,
    /// Byte stored; the frame is not complete yet.
    Consumed,
    /// The in-progress frame was discarded. The payload buffer, if any, is released.
    Dropped(DropReason),
    /// A complete, checksum-valid frame.
    FrameComplete(Frame),
    /// The in-progress frame was discarded, and the bytes it had swallowed
    /// held these complete frames, in stream order. Never empty.
    Recovered {
        reason: DropReason,
        frames: Vec<Frame>,
    },
}

impl ReceiveResult {
    /// Frames delivered by this outcome, in stream order.
    pub fn into_frames(self) -> Vec<Frame> {
        match self {
            Self::FrameComplete(frame) => vec![frame],
            Self::Recovered { frames, .. } => frames,
            _ => Vec::new(),
        }
    }
}

/// Observable receiver state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Idle, scanning for `SOH`.
    Sync,
    /// Accumulating the fixed-size header.
    Header,
    /// Accumulating the declared number of payload bytes.
    Payload,
    /// Accumulating terminator and checksum.
    Footer,
}

/// Internal state, carrying the scratch data each stage needs.
#[derive(Debug)]
enum RxState {
    Sync,
    Header {
        bytes: [u8; HEADER_LEN],
        filled: usize,
        crc: Checksum,
    },
    Payload {
        header: FrameHeader,
        buffer: Vec<u8>,
        crc: Checksum,
    },
    Footer {
        header: FrameHeader,
        buffer: Vec<u8>,
        bytes: [u8; FOOTER_LEN],
        filled: usize,
        crc: Checksum,
    },
}

/// Bytes that followed the `SOH` of a discarded candidate, to be fed again.
type Replay = Option<Vec<u8>>;

/// Byte-level frame reassembler for one link.
#[derive(Debug)]
pub struct FrameReceiver {
    state: RxState,
    max_payload: usize,
    frames_received: u32,
    frames_dropped: u32,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    /// Receiver accepting payloads up to [`DEFAULT_MAX_PAYLOAD`] bytes.
    pub const fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Receiver with a custom bound on the declared payload length.
    pub const fn with_max_payload(max_payload: usize) -> Self {
        Self {
            state: RxState::Sync,
            max_payload,
            frames_received: 0,
            frames_dropped: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        match self.state {
            RxState::Sync => LinkState::Sync,
            RxState::Header { .. } => LinkState::Header,
            RxState::Payload { .. } => LinkState::Payload,
            RxState::Footer { .. } => LinkState::Footer,
        }
    }

    /// `true` while no frame is being assembled.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, RxState::Sync)
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Number of frames delivered so far.
    pub fn frames_received(&self) -> u32 {
        self.frames_received
    }

    /// Number of frames discarded so far (noise, checksum, timeout).
    pub fn frames_dropped(&self) -> u32 {
        self.frames_dropped
    }

    /// Abandon any partial frame and return to `Sync`, releasing its buffer.
    ///
    /// Returns `true` when a partial frame was actually discarded.
    pub fn reset(&mut self) -> bool {
        let was_busy = !self.is_idle();
        self.state = RxState::Sync;
        if was_busy {
            self.frames_dropped = self.frames_dropped.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::debug!("Partial frame discarded: {}", DropReason::ReadTimeout);
        }
        was_busy
    }

    //==================================================================================Process Functions
    /// Feed a single byte.
    ///
    /// A byte that discards the current candidate may complete frames that
    /// were hidden inside it; those come back as [`ReceiveResult::Recovered`].
    pub fn push_byte(&mut self, byte: u8) -> ReceiveResult {
        match self.advance(byte) {
            (ReceiveResult::Dropped(reason), Some(bytes)) => {
                let frames = self.replay(bytes);
                if frames.is_empty() {
                    ReceiveResult::Dropped(reason)
                } else {
                    ReceiveResult::Recovered { reason, frames }
                }
            }
            (result, _) => result,
        }
    }

    /// Feed a chunk of bytes and collect every frame it completes.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        for byte in data {
            frames.extend(self.push_byte(*byte).into_frames());
        }
        frames
    }

    /// Run one byte through the pipeline and update the counters.
    fn advance(&mut self, byte: u8) -> (ReceiveResult, Replay) {
        let state = core::mem::replace(&mut self.state, RxState::Sync);
        let (next, result, replay) = self.step(state, byte);
        self.state = next;

        match &result {
            ReceiveResult::FrameComplete(_) => {
                self.frames_received = self.frames_received.wrapping_add(1);
            }
            ReceiveResult::Dropped(_reason) => {
                self.frames_dropped = self.frames_dropped.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::debug!("Frame dropped: {}", _reason);
            }
            _ => {}
        }
        (result, replay)
    }

    /// Feed the bytes of a discarded candidate again, starting from `Sync`.
    ///
    /// A candidate discarded during the replay is replayed in turn. Each one
    /// starts at a later `SOH` than the last, so the loop terminates.
    fn replay(&mut self, bytes: Vec<u8>) -> Vec<Frame> {
        let mut pending = VecDeque::from(bytes);
        let mut frames = Vec::new();
        while let Some(byte) = pending.pop_front() {
            let (result, replay) = self.advance(byte);
            if let ReceiveResult::FrameComplete(frame) = result {
                frames.push(frame);
            }
            if let Some(bytes) = replay {
                for byte in bytes.into_iter().rev() {
                    pending.push_front(byte);
                }
            }
        }
        frames
    }

    /// Advance the pipeline by one byte. Returning `RxState::Sync` drops any buffer.
    fn step(&self, state: RxState, byte: u8) -> (RxState, ReceiveResult, Replay) {
        match state {
            RxState::Sync => {
                if byte == SOH {
                    let header = RxState::Header {
                        bytes: [0; HEADER_LEN],
                        filled: 0,
                        crc: Checksum::new(),
                    };
                    (header, ReceiveResult::Consumed, None)
                } else {
                    (RxState::Sync, ReceiveResult::Ignored, None)
                }
            }

            RxState::Header {
                mut bytes,
                mut filled,
                mut crc,
            } => {
                bytes[filled] = byte;
                filled += 1;
                crc.push(byte);
                if filled < HEADER_LEN {
                    let next = RxState::Header { bytes, filled, crc };
                    return (next, ReceiveResult::Consumed, None);
                }
                self.begin_payload(&bytes, crc)
            }

            RxState::Payload {
                header,
                mut buffer,
                mut crc,
            } => {
                buffer.push(byte);
                crc.push(byte);
                let next = if buffer.len() == header.payload_len as usize {
                    RxState::Footer {
                        header,
                        buffer,
                        bytes: [0; FOOTER_LEN],
                        filled: 0,
                        crc,
                    }
                } else {
                    RxState::Payload { header, buffer, crc }
                };
                (next, ReceiveResult::Consumed, None)
            }

            RxState::Footer {
                header,
                buffer,
                mut bytes,
                mut filled,
                crc,
            } => {
                bytes[filled] = byte;
                filled += 1;
                if filled < FOOTER_LEN {
                    let next = RxState::Footer {
                        header,
                        buffer,
                        bytes,
                        filled,
                        crc,
                    };
                    return (next, ReceiveResult::Consumed, None);
                }
                let (result, replay) = Self::finish(header, buffer, bytes, crc);
                (RxState::Sync, result, replay)
            }
        }
    }

    /// Validate a complete header and prepare the payload stage.
    fn begin_payload(
        &self,
        bytes: &[u8; HEADER_LEN],
        crc: Checksum,
    ) -> (RxState, ReceiveResult, Replay) {
        let (header, marker) = FrameHeader::from_bytes(bytes);
        let rejected = |reason: DropReason| {
            (
                RxState::Sync,
                ReceiveResult::Dropped(reason),
                Some(bytes.to_vec()),
            )
        };

        if header.version != PROTOCOL_VERSION {
            return rejected(DropReason::BadVersion {
                found: header.version,
            });
        }
        if marker != STX {
            return rejected(DropReason::BadPayloadMarker);
        }

        let len = header.payload_len as usize;
        if len > self.max_payload {
            return rejected(DropReason::PayloadTooLarge {
                len,
                max: self.max_payload,
            });
        }

        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(len).is_err() {
            return rejected(DropReason::AllocationFailed);
        }

        let next = if len == 0 {
            RxState::Footer {
                header,
                buffer,
                bytes: [0; FOOTER_LEN],
                filled: 0,
                crc,
            }
        } else {
            RxState::Payload { header, buffer, crc }
        };
        (next, ReceiveResult::Consumed, None)
    }

    /// Check terminators and checksum of a fully received frame.
    fn finish(
        header: FrameHeader,
        payload: Vec<u8>,
        footer: [u8; FOOTER_LEN],
        mut crc: Checksum,
    ) -> (ReceiveResult, Replay) {
        let [etx, received, eot] = footer;
        let reason = if etx != ETX || eot != EOT {
            DropReason::BadTerminator
        } else {
            let computed = crc.push(etx).value();
            if computed == received {
                let frame = Frame {
                    sequence: header.sequence,
                    command: header.command,
                    payload,
                };
                return (ReceiveResult::FrameComplete(frame), None);
            }
            DropReason::ChecksumMismatch { computed, received }
        };
        (
            ReceiveResult::Dropped(reason),
            Self::swallowed(&header, &payload, &footer),
        )
    }

    /// Everything a failed candidate consumed after its `SOH`. `None` when
    /// there is no room to copy it, in which case those bytes are lost.
    fn swallowed(header: &FrameHeader, payload: &[u8], footer: &[u8; FOOTER_LEN]) -> Replay {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(HEADER_LEN + payload.len() + FOOTER_LEN)
            .ok()?;
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(footer);
        Some(bytes)
    }
}

/// Decode the first complete frame found in `bytes`.
///
/// Convenience for tests and tooling; live links keep a [`FrameReceiver`]
/// across reads instead. Returns the first drop reason, or
/// [`DropReason::Incomplete`], when no frame completes.
pub fn decode_frame(bytes: &[u8], max_payload: usize) -> Result<Frame, DropReason> {
    let mut receiver = FrameReceiver::with_max_payload(max_payload);
    let mut first_drop = None;
    for byte in bytes {
        match receiver.push_byte(*byte) {
            ReceiveResult::FrameComplete(frame) => return Ok(frame),
            ReceiveResult::Recovered { frames, .. } => {
                if let Some(frame) = frames.into_iter().next() {
                    return Ok(frame);
                }
            }
            ReceiveResult::Dropped(reason) => {
                first_drop.get_or_insert(reason);
            }
            _ => {}
        }
    }
    Err(first_drop.unwrap_or(DropReason::Incomplete))
}
