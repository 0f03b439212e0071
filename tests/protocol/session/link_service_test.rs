mod helpers {
    include!("../../helpers/mod.rs");
}

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use helpers::{HostLink, MockSerialPort, MockTimer};
use serlink::core::LinkCommand;
use serlink::error::LinkRunError;
use serlink::infra::codec::payload::{encode_forward, ForwardPayload, PingPayload};
use serlink::protocol::session::link_service::{LinkRequest, LinkService};
use serlink::protocol::session::{BusMessage, LinkConfig};
use serlink::protocol::transport::frame_builder::FrameBuilder;
use static_cell::StaticCell;
use tokio::time::Duration;

type Requests = Channel<CriticalSectionRawMutex, LinkRequest, 4>;
type Messages = Channel<CriticalSectionRawMutex, BusMessage, 8>;

static REQUEST_CHANNEL: StaticCell<Requests> = StaticCell::new();
static MESSAGE_CHANNEL: StaticCell<Messages> = StaticCell::new();

fn host_ping(builder: &mut FrameBuilder, name: &str) -> Vec<u8> {
    let payload = PingPayload::new(1_000, name).to_bytes();
    builder.encode(LinkCommand::Ping, &payload).unwrap()
}

fn host_forward(builder: &mut FrameBuilder, topic: &str, message: &str) -> Vec<u8> {
    let payload = encode_forward(topic, message).unwrap();
    builder.encode(LinkCommand::Forward, &payload).unwrap()
}

#[tokio::test]
async fn service_pings_connects_and_forwards() {
    let request_channel = REQUEST_CHANNEL.init(Channel::new());
    let message_channel = MESSAGE_CHANNEL.init(Channel::new());

    let (dut_port, host_port) = MockSerialPort::create_pair();
    let mut host = HostLink::new(host_port);
    let mut host_builder = FrameBuilder::new();

    let service = LinkService::new(
        LinkConfig::builder("A").build(),
        dut_port,
        MockTimer::new(),
        &*request_channel,
        &*message_channel,
    );
    let parts = service.into_parts();
    let handle = parts.handle;
    let mut messages = parts.messages;
    let runner_future = parts.runner.drive();
    tokio::pin!(runner_future);

    tokio::select! {
        result = &mut runner_future => {
            panic!("link service ended unexpectedly: {:?}", result);
        }
        _ = async {
            let ping = host.next_command(LinkCommand::Ping).await;
            let ping = PingPayload::from_bytes(&ping.payload).expect("valid ping payload");
            assert_eq!(ping.name, "A");

            host.send(&host_ping(&mut host_builder, "B"));
            assert_eq!(
                messages.recv().await,
                BusMessage::new("A/link/B", "connected", "A")
            );

            handle.publish("sensor/temp", "21.5", "thermometer").await;
            let frame = host.next_command(LinkCommand::Forward).await;
            assert_eq!(
                ForwardPayload::from_bytes(&frame.payload).unwrap(),
                ForwardPayload::new("A/sensor/temp", "21.5")
            );

            host.send(&host_forward(&mut host_builder, "B/door", "open"));
            assert_eq!(
                messages.recv().await,
                BusMessage::new("B/door", "open", "B")
            );
        } => {}
    }
}

#[tokio::test]
async fn service_drops_echoes_and_blocked_topics() {
    let request_channel = Requests::new();
    let message_channel = Messages::new();

    let (dut_port, host_port) = MockSerialPort::create_pair();
    let mut host = HostLink::new(host_port);
    let mut host_builder = FrameBuilder::new();

    let service = LinkService::new(
        LinkConfig::builder("A").build(),
        dut_port,
        MockTimer::new(),
        &request_channel,
        &message_channel,
    );
    let parts = service.into_parts();
    let handle = parts.handle;
    let mut messages = parts.messages;
    let runner_future = parts.runner.drive();
    tokio::pin!(runner_future);

    tokio::select! {
        result = &mut runner_future => {
            panic!("link service ended unexpectedly: {:?}", result);
        }
        _ = async {
            host.send(&host_ping(&mut host_builder, "B"));
            messages.recv().await;

            handle.block_outgoing("debug/#").await;
            handle.publish("debug/trace", "x", "app").await;
            handle.publish("B/door", "open", "B").await;
            handle.publish("A/link/B", "connected", "A").await;
            handle.publish("state", "ok", "app").await;

            // Only the last publication reaches the wire.
            let frame = host.next_command(LinkCommand::Forward).await;
            assert_eq!(
                ForwardPayload::from_bytes(&frame.payload).unwrap().topic,
                "A/state"
            );

            // Requests are applied in order: once `sync` is on the wire the block is active.
            handle.block_incoming("B/noisy/#").await;
            handle.publish("sync", "1", "app").await;
            host.next_command(LinkCommand::Forward).await;

            host.send(&host_forward(&mut host_builder, "B/noisy/chatter", "x"));
            host.send(&host_forward(&mut host_builder, "door", "closed"));
            assert_eq!(
                messages.recv().await,
                BusMessage::new("B/door", "closed", "B")
            );
        } => {}
    }
}

#[tokio::test]
async fn service_reports_refused_requests() {
    let request_channel = Requests::new();
    let message_channel = Messages::new();

    let (dut_port, host_port) = MockSerialPort::create_pair();
    let mut host = HostLink::new(host_port);

    let service = LinkService::new(
        LinkConfig::builder("A").block_list_capacity(1).build(),
        dut_port,
        MockTimer::new(),
        &request_channel,
        &message_channel,
    );
    let parts = service.into_parts();
    let handle = parts.handle;
    let mut messages = parts.messages;
    let runner_future = parts.runner.drive();
    tokio::pin!(runner_future);

    tokio::select! {
        result = &mut runner_future => {
            panic!("link service ended unexpectedly: {:?}", result);
        }
        _ = async {
            handle.unblock_incoming("never/added").await;
            assert_eq!(
                messages.recv().await,
                BusMessage::new("A/link/error", "Pattern not found", "A")
            );

            handle.block_outgoing("debug/#").await;
            handle.block_outgoing("trace/#").await;
            assert_eq!(
                messages.recv().await,
                BusMessage::new("A/link/error", "Block list full (1 entries)", "A")
            );

            handle.publish("t", "a\0b", "app").await;
            assert_eq!(
                messages.recv().await,
                BusMessage::new("A/link/error", "Embedded NUL in payload field", "A")
            );

            // Accepted requests stay quiet; the next publication crosses normally.
            handle.unblock_outgoing("debug/#").await;
            handle.publish("state", "ok", "app").await;
            let frame = host.next_command(LinkCommand::Forward).await;
            assert_eq!(
                ForwardPayload::from_bytes(&frame.payload).unwrap().topic,
                "A/state"
            );
            assert_eq!(messages.try_recv(), None);
        } => {}
    }
}

#[tokio::test(start_paused = true)]
async fn service_reports_silence_once() {
    let request_channel = Requests::new();
    let message_channel = Messages::new();

    let (dut_port, host_port) = MockSerialPort::create_pair();
    let host = HostLink::new(host_port);
    let mut host_builder = FrameBuilder::new();

    let service = LinkService::new(
        LinkConfig::builder("A").build(),
        dut_port,
        MockTimer::new(),
        &request_channel,
        &message_channel,
    );
    let parts = service.into_parts();
    let mut messages = parts.messages;
    let runner_future = parts.runner.drive();
    tokio::pin!(runner_future);

    tokio::select! {
        result = &mut runner_future => {
            panic!("link service ended unexpectedly: {:?}", result);
        }
        _ = async {
            host.send(&host_ping(&mut host_builder, "B"));
            assert_eq!(messages.recv().await.message, "connected");

            let started = tokio::time::Instant::now();
            let lost = messages.recv().await;
            assert_eq!(lost, BusMessage::new("A/link/B", "disconnected", "A"));
            let elapsed = started.elapsed();
            assert!(elapsed >= Duration::from_millis(10_000), "{elapsed:?}");
            assert!(elapsed <= Duration::from_millis(10_200), "{elapsed:?}");

            // Still silent a minute later: no further event.
            tokio::time::sleep(Duration::from_secs(60)).await;
            assert_eq!(messages.try_recv(), None);
        } => {}
    }
}

#[tokio::test]
async fn service_stops_when_line_is_gone() {
    let request_channel = Requests::new();
    let message_channel = Messages::new();

    let (dut_port, host_port) = MockSerialPort::create_pair();
    drop(host_port);

    let service = LinkService::new(
        LinkConfig::builder("A").build(),
        dut_port,
        MockTimer::new(),
        &request_channel,
        &message_channel,
    );
    let result = service.into_parts().runner.drive().await;
    assert!(matches!(result, Err(LinkRunError::Write(()))));
}
