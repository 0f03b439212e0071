//! Payload layouts of the two link commands.
//!
//! Both are sequences of NUL-terminated text fields:
//!
//! ```text
//! PING    : <decimal timestamp> NUL <node name, <= 9 bytes> NUL
//! FORWARD : <topic> NUL <message> NUL
//! ```
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str;

use crate::error::{EncodeError, PayloadError};

/// Longest node name a PING carries. Longer names are truncated when sending
/// and rejected when receiving.
pub const MAX_NODE_NAME_LEN: usize = 9;

//==================================================================================PING
/// Heartbeat content: who is on the other end and what its clock read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingPayload {
    /// Sender uptime in milliseconds. Informational; never used for clock sync.
    pub timestamp: Option<u64>,
    /// Sender node name.
    pub name: String,
}

impl PingPayload {
    /// Build a ping, truncating `name` to [`MAX_NODE_NAME_LEN`] bytes on a char boundary.
    pub fn new(timestamp: u64, name: &str) -> Self {
        Self {
            timestamp: Some(timestamp),
            name: truncate_name(name).to_string(),
        }
    }

    /// Serialize into the wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(22 + self.name.len());
        if let Some(timestamp) = self.timestamp {
            push_decimal(&mut out, timestamp);
        }
        out.push(0);
        out.extend_from_slice(truncate_name(&self.name).as_bytes());
        out.push(0);
        out
    }

    /// Parse a received PING payload.
    ///
    /// An unreadable timestamp is tolerated (`None`); a missing name terminator
    /// or an oversized name rejects the ping.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, PayloadError> {
        let (stamp, rest) = split_field(payload)?;
        let (name, _) = split_field(rest)?;

        if name.len() > MAX_NODE_NAME_LEN {
            return Err(PayloadError::NameTooLong {
                len: name.len(),
                max: MAX_NODE_NAME_LEN,
            });
        }
        let name = str::from_utf8(name).map_err(|_| PayloadError::InvalidUtf8)?;
        let timestamp = str::from_utf8(stamp).ok().and_then(|s| s.parse().ok());

        Ok(Self {
            timestamp,
            name: name.to_string(),
        })
    }
}

//==================================================================================FORWARD
/// A bridged bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPayload {
    pub topic: String,
    pub message: String,
}

impl ForwardPayload {
    pub fn new(topic: &str, message: &str) -> Self {
        Self {
            topic: topic.to_string(),
            message: message.to_string(),
        }
    }

    /// Serialize into the wire layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_forward(&self.topic, &self.message)
    }

    /// Parse a received FORWARD payload. Bytes after the message terminator are ignored.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, PayloadError> {
        let (topic, rest) = split_field(payload)?;
        let (message, _) = split_field(rest)?;
        if topic.is_empty() {
            return Err(PayloadError::EmptyTopic);
        }
        let topic = str::from_utf8(topic).map_err(|_| PayloadError::InvalidUtf8)?;
        let message = str::from_utf8(message).map_err(|_| PayloadError::InvalidUtf8)?;
        Ok(Self::new(topic, message))
    }
}

/// Serialize a topic/message pair without building a [`ForwardPayload`] first.
pub fn encode_forward(topic: &str, message: &str) -> Result<Vec<u8>, EncodeError> {
    if topic.is_empty() {
        return Err(EncodeError::EmptyTopic);
    }
    if topic.contains('\0') || message.contains('\0') {
        return Err(EncodeError::EmbeddedNul);
    }
    let mut out = Vec::with_capacity(topic.len() + message.len() + 2);
    out.extend_from_slice(topic.as_bytes());
    out.push(0);
    out.extend_from_slice(message.as_bytes());
    out.push(0);
    Ok(out)
}

//==================================================================================HELPERS
/// Split at the first NUL: returns the field and what follows the terminator.
fn split_field(bytes: &[u8]) -> Result<(&[u8], &[u8]), PayloadError> {
    let end = bytes
        .iter()
        .position(|b| *b == 0)
        .ok_or(PayloadError::MissingTerminator)?;
    Ok((&bytes[..end], &bytes[end + 1..]))
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NODE_NAME_LEN {
        return name;
    }
    let mut end = MAX_NODE_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn push_decimal(out: &mut Vec<u8>, mut value: u64) {
    let mut digits = [0u8; 20];
    let mut len = 0;
    loop {
        digits[len] = b'0' + (value % 10) as u8;
        len += 1;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    out.extend(digits[..len].iter().rev());
}
