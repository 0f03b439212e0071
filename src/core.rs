//! Defines the "data contract" shared by the frame builder (the writer) and
//! the byte receiver (the reader).
//!
//! Both sides agree on the marker bytes, the protocol version and the exact
//! header/footer layout below. Anything that touches the wire must go through
//! these definitions so the checksum covers the same bytes on either end.
//!
//! ```text
//! [SOH][VER][SEQ][CMD][LEN_HI][LEN_LO][STX] payload… [ETX][CRC][EOT]
//!       |<------------- checksum covers ------------------->|
//! ```
use alloc::vec::Vec;

/// Start of header: the only byte the receiver looks for while idle.
pub const SOH: u8 = 0x01;
/// Start of payload, last header byte.
pub const STX: u8 = 0x02;
/// End of payload, first footer byte (last byte covered by the checksum).
pub const ETX: u8 = 0x03;
/// End of frame.
pub const EOT: u8 = 0x04;

/// Protocol version carried by every frame. Frames with another value are dropped.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Header bytes following `SOH`: version, sequence, command, length (2), `STX`.
pub const HEADER_LEN: usize = 6;
/// Footer bytes: `ETX`, checksum, `EOT`.
pub const FOOTER_LEN: usize = 3;
/// Bytes a frame adds around its payload (`SOH` + header + footer).
pub const FRAME_OVERHEAD: usize = 1 + HEADER_LEN + FOOTER_LEN;

/// Largest payload the two length bytes can describe.
pub const MAX_WIRE_PAYLOAD: usize = u16::MAX as usize;

/// Commands understood by the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LinkCommand {
    /// Liveness heartbeat carrying the sender's uptime and node name.
    Ping = 0x00,
    /// Bridged publish/subscribe message (topic + message).
    Forward = 0x01,
}

impl LinkCommand {
    /// Wire value of the command.
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LinkCommand {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Ping),
            0x01 => Ok(Self::Forward),
            other => Err(other),
        }
    }
}

/// Decoded header fields (everything between `SOH` and the payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    /// Protocol version byte.
    pub version: u8,
    /// Sender's wrapping frame counter. Informational only.
    pub sequence: u8,
    /// Raw command byte; may hold a value this crate does not know.
    pub command: u8,
    /// Declared payload length.
    pub payload_len: u16,
}

impl FrameHeader {
    /// Header for a frame of the current protocol version.
    pub const fn new(sequence: u8, command: u8, payload_len: u16) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sequence,
            command,
            payload_len,
        }
    }

    /// Serialize into the six header bytes (without the leading `SOH`).
    pub const fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [hi, lo] = self.payload_len.to_be_bytes();
        [self.version, self.sequence, self.command, hi, lo, STX]
    }

    /// Parse the six header bytes. Returns the header and the payload marker
    /// found in the last position, which the caller validates.
    pub const fn from_bytes(bytes: &[u8; HEADER_LEN]) -> (Self, u8) {
        (
            Self {
                version: bytes[0],
                sequence: bytes[1],
                command: bytes[2],
                payload_len: u16::from_be_bytes([bytes[3], bytes[4]]),
            },
            bytes[5],
        )
    }
}

/// A validated frame as delivered by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender's sequence number (accepted but never checked).
    pub sequence: u8,
    /// Raw command byte.
    pub command: u8,
    /// Payload bytes; semantics depend on the command.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Typed command, `None` for command bytes this crate does not know.
    pub fn command(&self) -> Option<LinkCommand> {
        LinkCommand::try_from(self.command).ok()
    }
}
