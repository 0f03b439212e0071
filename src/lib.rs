//! `serlink` library: framing and link management for a point-to-point
//! serial line bridging two publish/subscribe buses, in a `no_std`
//! environment. The crate exposes the wire data contract, the codec
//! infrastructure (checksum, payloads), and the protocol logic (frame
//! transport, link session, async link service).
#![no_std]
extern crate alloc;
//==================================================================================
/// Wire data contract shared by the frame builder and the byte receiver.
pub mod core;
/// Encoding, transport-noise, payload and service errors.
pub mod error;
/// Checksum and payload codecs.
pub mod infra;
/// Link protocol implementation: frame transport, session logic and the
/// async service.
pub mod protocol;
//==================================================================================
