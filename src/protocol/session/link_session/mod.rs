//! Link session: turns validated frames into bus activity and bus activity
//! into frames, and decides when the peer is considered connected.
//!
//! The session is a plain state object. It performs no IO: every operation
//! takes the current time and returns the frames to write and the bus
//! messages to publish. [`LinkService`](super::link_service::LinkService)
//! wires it to a serial port and channels; a cooperative scheduler can call it
//! directly just as well.
//!
//! # Liveness
//!
//! ```text
//! DISCONNECTED --(valid PING or FORWARD)--> CONNECTED
//! CONNECTED --(read timeout mid-frame | ping receive timeout while idle)--> DISCONNECTED
//! ```
//!
//! Only the timers in [`LinkSession::tick`] ever disconnect the link; a
//! corrupt frame on its own changes nothing.
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use embassy_time::Instant;

use crate::core::{Frame, LinkCommand};
use crate::error::{BlockListError, EncodeError};
use crate::infra::codec::payload::{encode_forward, ForwardPayload, PingPayload};
use crate::protocol::session::config::{DomainToken, LinkConfig};
use crate::protocol::session::topic_filter::{BlockInsert, BlockList};
use crate::protocol::transport::frame_builder::FrameBuilder;
use crate::protocol::transport::frame_receiver::{FrameReceiver, LinkState};

/// Message published on the local bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub message: String,
    /// Component that published the message; used to stop forwarding loops.
    pub originator: String,
}

impl BusMessage {
    pub fn new(topic: &str, message: &str, originator: &str) -> Self {
        Self {
            topic: topic.to_string(),
            message: message.to_string(),
            originator: originator.to_string(),
        }
    }
}

/// Session-level connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Connection {
    Disconnected,
    Connected,
}

/// What a timer check asks the caller to do.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Heartbeat frame to write to the port.
    pub ping: Option<Vec<u8>>,
    /// Connectivity event to publish on the bus.
    pub event: Option<BusMessage>,
}

/// Runtime state of one serial link. Lives as long as the link.
#[derive(Debug)]
pub struct LinkSession {
    config: LinkConfig,
    builder: FrameBuilder,
    receiver: FrameReceiver,
    connection: Connection,
    peer_name: String,
    peer_timestamp: Option<u64>,
    last_read_at: Instant,
    last_message_at: Instant,
    last_ping_sent_at: Option<Instant>,
    last_ping_received_at: Option<Instant>,
    outgoing_block: BlockList,
    incoming_block: BlockList,
}

impl LinkSession {
    /// Create a disconnected session. `now` seeds the timeout bookkeeping.
    pub fn new(config: LinkConfig, now: Instant) -> Self {
        let receiver = FrameReceiver::with_max_payload(config.max_payload);
        let outgoing_block = BlockList::new(config.block_list_capacity);
        let incoming_block = BlockList::new(config.block_list_capacity);
        Self {
            config,
            builder: FrameBuilder::new(),
            receiver,
            connection: Connection::Disconnected,
            peer_name: String::new(),
            peer_timestamp: None,
            last_read_at: now,
            last_message_at: now,
            last_ping_sent_at: None,
            last_ping_received_at: None,
            outgoing_block,
            incoming_block,
        }
    }

    //==================================================================================Accessors
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Local node name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Name announced by the peer's last ping, if any arrived yet.
    pub fn peer_name(&self) -> Option<&str> {
        (!self.peer_name.is_empty()).then_some(self.peer_name.as_str())
    }

    /// Uptime reported by the peer's last ping. Informational only.
    pub fn peer_timestamp(&self) -> Option<u64> {
        self.peer_timestamp
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == Connection::Connected
    }

    /// Byte-level receiver state.
    pub fn receiver_state(&self) -> LinkState {
        self.receiver.state()
    }

    /// Frame counters and limits of the byte receiver.
    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }

    pub fn outgoing_block_list(&self) -> &BlockList {
        &self.outgoing_block
    }

    pub fn incoming_block_list(&self) -> &BlockList {
        &self.incoming_block
    }

    /// `true` for a short pulse after each received ping; meant to drive a status LED.
    pub fn activity_indicator(&self, now: Instant) -> bool {
        self.last_ping_received_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.config.activity_pulse)
    }

    //==================================================================================Block lists
    /// Stop topics matching `pattern` from being sent to the peer.
    pub fn block_outgoing(&mut self, pattern: &str) -> Result<BlockInsert, BlockListError> {
        self.outgoing_block.insert(pattern)
    }

    pub fn unblock_outgoing(&mut self, pattern: &str) -> Result<(), BlockListError> {
        self.outgoing_block.remove(pattern)
    }

    /// Stop topics matching `pattern` received from the peer from reaching the local bus.
    pub fn block_incoming(&mut self, pattern: &str) -> Result<BlockInsert, BlockListError> {
        self.incoming_block.insert(pattern)
    }

    pub fn unblock_incoming(&mut self, pattern: &str) -> Result<(), BlockListError> {
        self.incoming_block.remove(pattern)
    }

    //==================================================================================Outbound
    /// Handle a message seen on the local bus.
    ///
    /// Returns the FORWARD frame to write, or `None` when the message must not
    /// cross the link (it came from the peer or from this link, or its topic
    /// is blocked).
    pub fn forward(
        &mut self,
        topic: &str,
        message: &str,
        originator: &str,
    ) -> Result<Option<Vec<u8>>, EncodeError> {
        if originator == self.config.name
            || (!self.peer_name.is_empty() && originator == self.peer_name)
        {
            return Ok(None);
        }
        if self.outgoing_block.blocks(topic) {
            #[cfg(feature = "defmt")]
            defmt::trace!("Outgoing topic blocked: {}", topic);
            return Ok(None);
        }

        let wire_topic = self.outbound_topic(topic);
        let payload = encode_forward(&wire_topic, message)?;
        if payload.len() > self.config.max_payload {
            return Err(EncodeError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload,
            });
        }
        self.builder.encode(LinkCommand::Forward, &payload).map(Some)
    }

    /// Encode a heartbeat now, regardless of the ping period.
    pub fn ping(&mut self, now: Instant) -> Option<Vec<u8>> {
        let payload = PingPayload::new(now.as_millis(), &self.config.name).to_bytes();
        match self.builder.encode(LinkCommand::Ping, &payload) {
            Ok(frame) => {
                self.last_ping_sent_at = Some(now);
                Some(frame)
            }
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Ping encoding failed: {}", _err);
                None
            }
        }
    }

    //==================================================================================Inbound
    /// Feed bytes read from the port. Returns the messages to publish locally.
    pub fn receive(&mut self, bytes: &[u8], now: Instant) -> Vec<BusMessage> {
        let mut out = Vec::new();
        for byte in bytes {
            self.last_read_at = now;
            for frame in self.receiver.push_byte(*byte).into_frames() {
                self.dispatch(frame, now, &mut out);
            }
        }
        out
    }

    /// Act on a validated frame.
    fn dispatch(&mut self, frame: Frame, now: Instant, out: &mut Vec<BusMessage>) {
        match frame.command() {
            Some(LinkCommand::Ping) => match PingPayload::from_bytes(&frame.payload) {
                Ok(ping) => {
                    self.peer_name = ping.name;
                    self.peer_timestamp = ping.timestamp;
                    self.last_message_at = now;
                    self.last_ping_received_at = Some(now);
                    out.extend(self.mark_connected());
                }
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Malformed ping ignored: {}", _err);
                }
            },
            Some(LinkCommand::Forward) => match ForwardPayload::from_bytes(&frame.payload) {
                Ok(forward) => {
                    self.last_message_at = now;
                    out.extend(self.mark_connected());
                    if self.incoming_block.blocks(&forward.topic) {
                        #[cfg(feature = "defmt")]
                        defmt::trace!("Incoming topic blocked: {}", forward.topic.as_str());
                        return;
                    }
                    out.push(BusMessage {
                        topic: self.inbound_topic(&forward.topic),
                        message: forward.message,
                        originator: self.peer_name.clone(),
                    });
                }
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Malformed forward ignored: {}", _err);
                }
            },
            None => {
                #[cfg(feature = "defmt")]
                defmt::trace!("Unknown command {} ignored", frame.command);
            }
        }
    }

    //==================================================================================Timers
    /// Evaluate the heartbeat and timeout timers. Call once per scheduler slice.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let mut tick = Tick::default();

        let ping_due = self
            .last_ping_sent_at
            .map_or(true, |at| now.saturating_duration_since(at) > self.config.ping_period);
        if ping_due {
            tick.ping = self.ping(now);
        }

        if !self.receiver.is_idle() {
            if now.saturating_duration_since(self.last_read_at) > self.config.read_timeout {
                self.receiver.reset();
                tick.event = self.mark_disconnected();
            }
        } else if now.saturating_duration_since(self.last_message_at)
            > self.config.ping_receive_timeout
        {
            tick.event = self.mark_disconnected();
        }

        tick
    }

    //==================================================================================Helpers
    fn mark_connected(&mut self) -> Option<BusMessage> {
        if self.connection == Connection::Connected {
            return None;
        }
        self.connection = Connection::Connected;
        #[cfg(feature = "defmt")]
        defmt::info!("Link connected to {}", self.peer_name.as_str());
        Some(self.link_event("connected"))
    }

    fn mark_disconnected(&mut self) -> Option<BusMessage> {
        if self.connection == Connection::Disconnected {
            return None;
        }
        self.connection = Connection::Disconnected;
        #[cfg(feature = "defmt")]
        defmt::info!("Link to {} lost", self.peer_name.as_str());
        Some(self.link_event("disconnected"))
    }

    /// `<name>/link/<peer>` (or `<name>/link` before the peer introduced itself).
    fn link_event(&self, state: &str) -> BusMessage {
        let topic = if self.peer_name.is_empty() {
            format!("{}/link", self.config.name)
        } else {
            format!("{}/link/{}", self.config.name, self.peer_name)
        };
        BusMessage {
            topic,
            message: state.to_string(),
            originator: self.config.name.clone(),
        }
    }

    /// `<name>/link/error` carrying the text of a refused request.
    pub fn error_event(&self, error: &impl core::fmt::Display) -> BusMessage {
        BusMessage {
            topic: format!("{}/link/error", self.config.name),
            message: error.to_string(),
            originator: self.config.name.clone(),
        }
    }

    fn token_text<'a>(&'a self, token: &'a DomainToken) -> &'a str {
        match token {
            DomainToken::LocalName => &self.config.name,
            DomainToken::PeerName => &self.peer_name,
            DomainToken::Fixed(text) => text,
            DomainToken::None => "",
        }
    }

    fn outbound_topic(&self, topic: &str) -> String {
        let prefix = self.token_text(&self.config.outgoing_token);
        if prefix.is_empty() || strip_level(topic, prefix).is_some() {
            topic.to_string()
        } else {
            format!("{prefix}/{topic}")
        }
    }

    fn inbound_topic(&self, topic: &str) -> String {
        let stripped = [self.config.name.as_str(), self.peer_name.as_str()]
            .into_iter()
            .filter(|name| !name.is_empty())
            .find_map(|name| strip_level(topic, name))
            .unwrap_or(topic);

        let prefix = self.token_text(&self.config.incoming_token);
        if prefix.is_empty() {
            stripped.to_string()
        } else {
            format!("{prefix}/{stripped}")
        }
    }
}

/// `topic` without its leading `<level>/`, if it starts with one.
fn strip_level<'a>(topic: &'a str, level: &str) -> Option<&'a str> {
    topic.strip_prefix(level)?.strip_prefix('/')
}
