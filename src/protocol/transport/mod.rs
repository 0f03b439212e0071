//! Serial link transport layer: frame construction, byte-by-byte
//! reassembly, and the serial/timer abstraction traits.
//!
//! ## Link Timing Constants
//!
//! These constants define the default cadence and timeouts of a link. They can
//! be overridden per link through [`LinkConfig`](crate::protocol::session::LinkConfig).

pub mod frame_builder;
pub mod frame_receiver;
pub mod traits;

/// Default interval between two heartbeats sent to the peer (ms).
pub const PING_PERIOD_MS: u64 = 5_000;

/// Default time a partially received frame may wait for its next byte (ms).
///
/// Only applies while the receiver is mid-frame. When it expires the partial
/// frame is discarded and the link is reported disconnected.
pub const READ_TIMEOUT_MS: u64 = 5_000;

/// Default silence tolerated while idle before the link is reported down (ms).
///
/// Twice the ping period, so a single lost heartbeat does not flap the link.
pub const PING_RECEIVE_TIMEOUT_MS: u64 = 10_000;

/// Default interval at which the link service polls its timers (ms).
///
/// # Recommended Values
///
/// - **20 ms**: responsive links at 115200 baud.
/// - **50 ms**: default, matches typical cooperative scheduler slices.
pub const POLL_INTERVAL_MS: u32 = 50;

/// Default bound on an accepted payload length (bytes).
///
/// The wire format allows 65535, but a corrupted length field must not be
/// able to trigger a large allocation on a microcontroller.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// How long the activity indicator stays on after a received ping (ms).
pub const ACTIVITY_PULSE_MS: u64 = 100;
