//! Abstraction traits used by the link (serial port and timer).
pub mod link_timer;
pub mod serial_port;
