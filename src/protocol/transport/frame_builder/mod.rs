//! Frame generator for the serial link. Wraps a payload in header, footer and
//! checksum, producing the exact byte sequence to write to the port.
//!
//! No byte stuffing is performed: the receiver trusts the declared length once
//! past the start marker, so marker values inside a payload are harmless.
use alloc::vec::Vec;

use crate::core::{FrameHeader, LinkCommand, EOT, ETX, FRAME_OVERHEAD, MAX_WIRE_PAYLOAD, SOH};
use crate::error::EncodeError;
use crate::infra::codec::checksum::Checksum;

/// Encode one frame with an explicit sequence number and raw command byte.
///
/// Fails without producing output when the payload exceeds the two-byte length field.
pub fn encode_frame(sequence: u8, command: u8, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    if payload.len() > MAX_WIRE_PAYLOAD {
        return Err(EncodeError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_WIRE_PAYLOAD,
        });
    }

    let header = FrameHeader::new(sequence, command, payload.len() as u16).to_bytes();
    let crc = Checksum::new()
        .update(&header)
        .update(payload)
        .push(ETX)
        .value();

    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    frame.push(SOH);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[ETX, crc, EOT]);
    Ok(frame)
}

#[derive(Debug, Default)]
/// Per-link encoder owning the wrapping 8-bit sequence counter.
pub struct FrameBuilder {
    next_sequence: u8,
}

impl FrameBuilder {
    pub const fn new() -> Self {
        Self { next_sequence: 0 }
    }

    /// Override the next sequence number.
    ///
    /// # Recommended usage
    /// Testing or replaying captured traffic. In production let the builder count.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.next_sequence = sequence;
        self
    }

    /// Sequence number the next frame will carry.
    pub fn next_sequence(&self) -> u8 {
        self.next_sequence
    }

    /// Encode a frame and advance the counter. The counter is left untouched on error.
    pub fn encode(&mut self, command: LinkCommand, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let frame = encode_frame(self.next_sequence, command.as_byte(), payload)?;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Ok(frame)
    }
}
