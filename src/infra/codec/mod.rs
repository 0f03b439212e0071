//! Byte-level codecs shared by the frame builder, the receiver and the session.
pub mod checksum;
pub mod payload;
