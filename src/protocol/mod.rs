//! Serial link protocol: framing and byte reassembly (`transport`), then
//! liveness, topic bridging and the async service (`session`).
pub mod session;
pub mod transport;
