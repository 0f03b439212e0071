//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (frame encoding, transport
//! noise on the receive side, payload parsing, block list administration and
//! serial IO in the link service).
use thiserror_no_std::Error;

//==================================================================================ENCODE_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while building an outgoing frame. Nothing is written when one occurs.
pub enum EncodeError {
    /// Payload does not fit the length field (or the configured bound).
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
    /// Topic or message contains a NUL byte, which is the payload field separator.
    #[error("Embedded NUL in payload field")]
    EmbeddedNul,
    /// FORWARD payloads need a topic.
    #[error("Empty topic")]
    EmptyTopic,
}

//==================================================================================DROP_REASON
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Transport noise: why the receiver discarded an in-progress frame.
///
/// None of these are fatal: the in-progress frame is discarded and the
/// receiver hunts for the next start marker.
pub enum DropReason {
    /// Header carried another protocol version.
    #[error("Unsupported protocol version {found}")]
    BadVersion { found: u8 },
    /// Last header byte was not the start-of-payload marker.
    #[error("Missing start-of-payload marker")]
    BadPayloadMarker,
    /// Declared payload length exceeds the accepted bound.
    #[error("Declared payload length {len} exceeds {max}")]
    PayloadTooLarge { len: usize, max: usize },
    /// The payload buffer could not be allocated.
    #[error("Payload buffer allocation failed")]
    AllocationFailed,
    /// End-of-payload or end-of-frame marker missing.
    #[error("Malformed frame terminator")]
    BadTerminator,
    /// Received checksum does not match the computed one.
    #[error("Checksum mismatch: computed {computed:#04X}, received {received:#04X}")]
    ChecksumMismatch { computed: u8, received: u8 },
    /// Partial frame discarded because the line went quiet.
    #[error("Read timeout while assembling a frame")]
    ReadTimeout,
    /// Input ended before a complete frame was seen.
    #[error("Incomplete frame")]
    Incomplete,
}

//==================================================================================PAYLOAD_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while interpreting the payload of a valid frame.
pub enum PayloadError {
    /// A NUL-terminated field has no terminator.
    #[error("Missing NUL terminator")]
    MissingTerminator,
    /// Field is not valid UTF-8.
    #[error("Invalid UTF-8 in payload")]
    InvalidUtf8,
    /// Node name in a PING is longer than allowed.
    #[error("Node name too long: {len} bytes (max {max})")]
    NameTooLong { len: usize, max: usize },
    /// FORWARD payload carries an empty topic.
    #[error("Empty topic")]
    EmptyTopic,
}

//==================================================================================BLOCK_LIST_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Block list administration failures.
pub enum BlockListError {
    /// Removal of a pattern that is not in the list.
    #[error("Pattern not found")]
    NotFound,
    /// The list already holds its maximum number of patterns.
    #[error("Block list full ({capacity} entries)")]
    Full { capacity: usize },
}

//==================================================================================LINK_RUN_ERROR
#[derive(Error, Debug)]
/// Errors that end the link service loop.
pub enum LinkRunError<E: core::fmt::Debug> {
    /// Serial port refused to deliver bytes.
    #[error("Serial read error: {0:?}")]
    Read(E),
    /// Serial port refused to accept a frame.
    #[error("Serial write error: {0:?}")]
    Write(E),
}
