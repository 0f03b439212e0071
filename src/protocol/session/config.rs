//! Per-link configuration: identity, timers, bounds and topic domain tokens.
use alloc::string::{String, ToString};
use embassy_time::Duration;

use crate::protocol::transport::{
    ACTIVITY_PULSE_MS, DEFAULT_MAX_PAYLOAD, PING_PERIOD_MS, PING_RECEIVE_TIMEOUT_MS,
    POLL_INTERVAL_MS, READ_TIMEOUT_MS,
};

/// Default number of patterns each block list may hold.
pub const DEFAULT_BLOCK_LIST_CAPACITY: usize = 32;

/// Prefix applied to topics crossing the link in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainToken {
    /// This node's name.
    LocalName,
    /// The name announced by the peer's last ping.
    PeerName,
    /// A fixed prefix.
    Fixed(String),
    /// Topics cross unchanged.
    None,
}

/// Link settings. Build with [`LinkConfig::builder`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub(crate) name: String,
    pub(crate) ping_period: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) ping_receive_timeout: Duration,
    pub(crate) poll_interval_ms: u32,
    pub(crate) max_payload: usize,
    pub(crate) block_list_capacity: usize,
    pub(crate) activity_pulse: Duration,
    pub(crate) outgoing_token: DomainToken,
    pub(crate) incoming_token: DomainToken,
}

impl LinkConfig {
    /// Builder with the default timers for a node called `name`.
    pub fn builder(name: &str) -> LinkConfigBuilder {
        LinkConfigBuilder::new(name)
    }

    /// Local node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ping_period(&self) -> Duration {
        self.ping_period
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn ping_receive_timeout(&self) -> Duration {
        self.ping_receive_timeout
    }

    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_ms
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn outgoing_token(&self) -> &DomainToken {
        &self.outgoing_token
    }

    pub fn incoming_token(&self) -> &DomainToken {
        &self.incoming_token
    }
}

//==================================================================================LINK_CONFIG_BUILDER
#[derive(Debug)]
/// Fluent builder for [`LinkConfig`].
pub struct LinkConfigBuilder {
    config: LinkConfig,
}

impl LinkConfigBuilder {
    fn new(name: &str) -> Self {
        Self {
            config: LinkConfig {
                name: name.to_string(),
                ping_period: Duration::from_millis(PING_PERIOD_MS),
                read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
                ping_receive_timeout: Duration::from_millis(PING_RECEIVE_TIMEOUT_MS),
                poll_interval_ms: POLL_INTERVAL_MS,
                max_payload: DEFAULT_MAX_PAYLOAD,
                block_list_capacity: DEFAULT_BLOCK_LIST_CAPACITY,
                activity_pulse: Duration::from_millis(ACTIVITY_PULSE_MS),
                outgoing_token: DomainToken::LocalName,
                incoming_token: DomainToken::PeerName,
            },
        }
    }

    pub fn ping_period(mut self, period: Duration) -> Self {
        self.config.ping_period = period;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn ping_receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.ping_receive_timeout = timeout;
        self
    }

    /// Cadence of the service's timer checks, clamped to at least 1 ms.
    pub fn poll_interval_ms(mut self, interval: u32) -> Self {
        self.config.poll_interval_ms = interval.max(1);
        self
    }

    /// Bound on payload length, both directions. Clamped to the wire maximum.
    pub fn max_payload(mut self, max: usize) -> Self {
        self.config.max_payload = max.min(crate::core::MAX_WIRE_PAYLOAD);
        self
    }

    pub fn block_list_capacity(mut self, capacity: usize) -> Self {
        self.config.block_list_capacity = capacity;
        self
    }

    pub fn activity_pulse(mut self, pulse: Duration) -> Self {
        self.config.activity_pulse = pulse;
        self
    }

    /// Prefix for topics sent to the peer (default: local name).
    pub fn outgoing_token(mut self, token: DomainToken) -> Self {
        self.config.outgoing_token = token;
        self
    }

    /// Prefix for topics received from the peer (default: peer name).
    pub fn incoming_token(mut self, token: DomainToken) -> Self {
        self.config.incoming_token = token;
        self
    }

    pub fn build(self) -> LinkConfig {
        self.config
    }
}
