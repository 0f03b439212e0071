//! Link service built on top of [`LinkSession`].
//!
//! It keeps the session fed with serial bytes and timer ticks and offers:
//!
//! * a request handle (`LinkHandle`) to publish local bus messages across the link
//!   and administer the block lists;
//! * a message receiver (`LinkMessages`) to pull what the peer published plus the
//!   link's own connectivity events and refused requests.
//!
//! Firmware provides pre-allocated [`embassy_sync::Channel`] instances and
//! picks the [`RawMutex`] flavour matching its executor. The runner must be
//! polled by exactly one task; handles may be shared freely.
use alloc::string::{String, ToString};

use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    channel::{Channel, Receiver, Sender},
};
use embassy_time::Duration;
use futures_util::{future::select, future::Either, pin_mut};

use crate::error::{BlockListError, LinkRunError};
use crate::protocol::session::config::LinkConfig;
use crate::protocol::session::link_session::{BusMessage, LinkSession, Tick};
use crate::protocol::transport::traits::link_timer::LinkTimer;
use crate::protocol::transport::traits::serial_port::SerialPort;

/// Size of the scratch buffer handed to [`SerialPort::read`].
pub const READ_CHUNK: usize = 64;

/// Service assembling the link components.
pub struct LinkService<
    'a,
    M: RawMutex,
    P: SerialPort,
    T: LinkTimer,
    const REQ_CAP: usize,
    const MSG_CAP: usize,
> {
    session: LinkSession,
    port: P,
    timer: T,
    request_channel: &'a Channel<M, LinkRequest, REQ_CAP>,
    message_channel: &'a Channel<M, BusMessage, MSG_CAP>,
}

impl<'a, M, P, T, const REQ_CAP: usize, const MSG_CAP: usize>
    LinkService<'a, M, P, T, REQ_CAP, MSG_CAP>
where
    M: RawMutex,
    P: SerialPort,
    T: LinkTimer,
{
    /// Build a disconnected link over `port`.
    pub fn new(
        config: LinkConfig,
        port: P,
        timer: T,
        request_channel: &'a Channel<M, LinkRequest, REQ_CAP>,
        message_channel: &'a Channel<M, BusMessage, MSG_CAP>,
    ) -> Self {
        let session = LinkSession::new(config, timer.now());
        Self {
            session,
            port,
            timer,
            request_channel,
            message_channel,
        }
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    /// Split into handle/receiver/runner components.
    pub fn into_parts(self) -> LinkServiceParts<'a, M, P, T, REQ_CAP, MSG_CAP> {
        LinkServiceParts {
            handle: LinkHandle {
                sender: self.request_channel.sender(),
            },
            messages: LinkMessages {
                receiver: self.message_channel.receiver(),
            },
            runner: LinkRunner {
                session: self.session,
                port: self.port,
                timer: self.timer,
                request_channel: self.request_channel,
                message_channel: self.message_channel,
            },
        }
    }
}

/// Bundle returned by [`LinkService::into_parts`].
pub struct LinkServiceParts<'a, M, P, T, const REQ_CAP: usize, const MSG_CAP: usize>
where
    M: RawMutex,
    P: SerialPort,
    T: LinkTimer,
{
    pub handle: LinkHandle<'a, M, REQ_CAP>,
    pub messages: LinkMessages<'a, M, MSG_CAP>,
    pub runner: LinkRunner<'a, M, P, T, REQ_CAP, MSG_CAP>,
}

/// Why the runner woke up.
enum Wake {
    Read(usize),
    Request(LinkRequest),
    Poll,
}

/// Runner that drives the link loop.
pub struct LinkRunner<'a, M, P, T, const REQ_CAP: usize, const MSG_CAP: usize>
where
    M: RawMutex,
    P: SerialPort,
    T: LinkTimer,
{
    session: LinkSession,
    port: P,
    timer: T,
    request_channel: &'a Channel<M, LinkRequest, REQ_CAP>,
    message_channel: &'a Channel<M, BusMessage, MSG_CAP>,
}

impl<'a, M, P, T, const REQ_CAP: usize, const MSG_CAP: usize>
    LinkRunner<'a, M, P, T, REQ_CAP, MSG_CAP>
where
    M: RawMutex,
    P: SerialPort,
    T: LinkTimer,
{
    /// Run the link until the serial port fails.
    ///
    /// Pings immediately, then races the port, the request queue and the poll
    /// timer. Timers are evaluated at least once per poll interval even when
    /// bytes arrive continuously. Received messages are pushed to the message
    /// channel with backpressure: keep draining it.
    pub async fn drive(mut self) -> Result<(), LinkRunError<P::Error>> {
        let poll = Duration::from_millis(self.session.config().poll_interval_ms() as u64);
        let mut buffer = [0u8; READ_CHUNK];

        let now = self.timer.now();
        let tick = self.session.tick(now);
        self.apply_tick(tick).await?;
        let mut next_tick = now + poll;

        loop {
            // Rounded up so a sub-millisecond remainder never becomes a zero delay.
            let wait_ms = next_tick
                .saturating_duration_since(self.timer.now())
                .as_micros()
                .div_ceil(1_000) as u32;
            let wake = {
                let read_future = self.port.read(&mut buffer);
                let request_future = self.request_channel.receive();
                let delay_future = self.timer.delay_ms(wait_ms);
                pin_mut!(read_future);
                pin_mut!(request_future);
                pin_mut!(delay_future);

                match select(read_future, select(request_future, delay_future)).await {
                    Either::Left((result, _)) => Wake::Read(result.map_err(LinkRunError::Read)?),
                    Either::Right((Either::Left((request, _)), _)) => Wake::Request(request),
                    Either::Right((Either::Right(((), _)), _)) => Wake::Poll,
                }
            };

            match wake {
                Wake::Read(len) => {
                    let messages = self.session.receive(&buffer[..len], self.timer.now());
                    for message in messages {
                        self.message_channel.send(message).await;
                    }
                }
                Wake::Request(request) => self.handle_request(request).await?,
                Wake::Poll => {}
            }

            let now = self.timer.now();
            if now >= next_tick {
                let tick = self.session.tick(now);
                self.apply_tick(tick).await?;
                next_tick = now + poll;
            }
        }
    }

    async fn apply_tick(&mut self, tick: Tick) -> Result<(), LinkRunError<P::Error>> {
        if let Some(frame) = tick.ping {
            self.port.write(&frame).await.map_err(LinkRunError::Write)?;
        }
        if let Some(event) = tick.event {
            self.message_channel.send(event).await;
        }
        Ok(())
    }

    /// Apply one request. A refused request is reported on the local bus as
    /// `<name>/link/error` carrying the error text.
    async fn handle_request(&mut self, request: LinkRequest) -> Result<(), LinkRunError<P::Error>> {
        let refused = match request {
            LinkRequest::Publish(message) => {
                match self
                    .session
                    .forward(&message.topic, &message.message, &message.originator)
                {
                    Ok(Some(frame)) => {
                        self.port.write(&frame).await.map_err(LinkRunError::Write)?;
                        None
                    }
                    Ok(None) => None,
                    Err(err) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("Forward of {} refused: {}", message.topic.as_str(), err);
                        Some(self.session.error_event(&err))
                    }
                }
            }
            LinkRequest::BlockOutgoing(pattern) => {
                let result = self.session.block_outgoing(&pattern).map(|_| ());
                self.block_refusal(result)
            }
            LinkRequest::UnblockOutgoing(pattern) => {
                let result = self.session.unblock_outgoing(&pattern);
                self.block_refusal(result)
            }
            LinkRequest::BlockIncoming(pattern) => {
                let result = self.session.block_incoming(&pattern).map(|_| ());
                self.block_refusal(result)
            }
            LinkRequest::UnblockIncoming(pattern) => {
                let result = self.session.unblock_incoming(&pattern);
                self.block_refusal(result)
            }
        };

        if let Some(event) = refused {
            self.message_channel.send(event).await;
        }
        Ok(())
    }

    fn block_refusal(&self, result: Result<(), BlockListError>) -> Option<BusMessage> {
        let err = result.err()?;
        #[cfg(feature = "defmt")]
        defmt::warn!("Block list request failed: {}", err);
        Some(self.session.error_event(&err))
    }
}

/// Request handle. Cheap to copy; every producer task may hold one.
pub struct LinkHandle<'a, M: RawMutex, const REQ_CAP: usize> {
    sender: Sender<'a, M, LinkRequest, REQ_CAP>,
}

impl<'a, M: RawMutex, const REQ_CAP: usize> Clone for LinkHandle<'a, M, REQ_CAP> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender,
        }
    }
}

impl<'a, M: RawMutex, const REQ_CAP: usize> Copy for LinkHandle<'a, M, REQ_CAP> {}

impl<'a, M: RawMutex, const REQ_CAP: usize> LinkHandle<'a, M, REQ_CAP> {
    /// Hand a local bus message to the link. Loop prevention and the outgoing
    /// block list decide whether it actually crosses. A message that cannot be
    /// encoded comes back on [`LinkMessages`] as `<name>/link/error`.
    pub async fn publish(&self, topic: &str, message: &str, originator: &str) {
        let message = BusMessage::new(topic, message, originator);
        self.sender.send(LinkRequest::Publish(message)).await;
    }

    pub async fn send(&self, request: LinkRequest) {
        self.sender.send(request).await;
    }

    /// Stop topics matching `pattern` from crossing to the peer. A full block
    /// list is reported on [`LinkMessages`] as `<name>/link/error`.
    pub async fn block_outgoing(&self, pattern: &str) {
        self.send(LinkRequest::BlockOutgoing(pattern.to_string())).await;
    }

    /// Remove an outgoing pattern. An unknown pattern is reported on
    /// [`LinkMessages`] as `<name>/link/error` (`"Pattern not found"`).
    pub async fn unblock_outgoing(&self, pattern: &str) {
        self.send(LinkRequest::UnblockOutgoing(pattern.to_string())).await;
    }

    pub async fn block_incoming(&self, pattern: &str) {
        self.send(LinkRequest::BlockIncoming(pattern.to_string())).await;
    }

    /// Same as [`Self::unblock_outgoing`], for the incoming list.
    pub async fn unblock_incoming(&self, pattern: &str) {
        self.send(LinkRequest::UnblockIncoming(pattern.to_string())).await;
    }
}

/// Receiver returning messages to publish on the local bus.
pub struct LinkMessages<'a, M: RawMutex, const MSG_CAP: usize> {
    receiver: Receiver<'a, M, BusMessage, MSG_CAP>,
}

impl<'a, M: RawMutex, const MSG_CAP: usize> LinkMessages<'a, M, MSG_CAP> {
    pub async fn recv(&mut self) -> BusMessage {
        self.receiver.receive().await
    }

    /// Next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        self.receiver.try_receive().ok()
    }
}

/// Requests queued by producer tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRequest {
    Publish(BusMessage),
    BlockOutgoing(String),
    UnblockOutgoing(String),
    BlockIncoming(String),
    UnblockIncoming(String),
}
