//! Low-level building blocks with no protocol state: checksum and payload codecs.
pub mod codec;
