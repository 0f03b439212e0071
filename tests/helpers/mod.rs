/// Test doubles to simulate the serial line and timer during integration tests.
use embassy_time::Instant;
use serlink::core::{Frame, LinkCommand};
use serlink::protocol::transport::{
    frame_receiver::FrameReceiver,
    traits::{link_timer::LinkTimer, serial_port::SerialPort},
};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

#[allow(dead_code)]
/// In-memory serial line reproducing the `SerialPort` trait behavior.
pub struct MockSerialPort {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

#[allow(dead_code)]
impl MockSerialPort {
    /// Construct a pair of cross-wired ports (DUT ↔ host).
    pub fn create_pair() -> (Self, Self) {
        let (dut_tx, host_rx) = mpsc::unbounded_channel();
        let (host_tx, dut_rx) = mpsc::unbounded_channel();

        let dut_port = Self {
            tx: dut_tx,
            rx: dut_rx,
            pending: VecDeque::new(),
        };

        let host_port = Self {
            tx: host_tx,
            rx: host_rx,
            pending: VecDeque::new(),
        };

        (dut_port, host_port)
    }

    /// Push raw bytes to the other end without going through the trait.
    pub fn inject(&self, bytes: &[u8]) {
        self.tx.send(bytes.to_vec()).expect("peer port dropped");
    }
}

impl SerialPort for MockSerialPort {
    type Error = ();

    async fn write<'a>(&'a mut self, bytes: &'a [u8]) -> Result<(), Self::Error> {
        self.tx.send(bytes.to_vec()).map_err(|_| ())
    }

    async fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> Result<usize, Self::Error> {
        // `mpsc::Receiver::recv` is cancel-safe; leftovers stay in `pending`.
        if self.pending.is_empty() {
            let chunk = self.rx.recv().await.ok_or(())?;
            self.pending.extend(chunk);
        }
        let len = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

#[allow(dead_code)]
/// Timer based on the tokio clock, so `start_paused` tests run instantly.
pub struct MockTimer {
    start: tokio::time::Instant,
}

#[allow(dead_code)]
impl MockTimer {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl LinkTimer for MockTimer {
    fn now(&self) -> Instant {
        Instant::from_micros(self.start.elapsed().as_micros() as u64)
    }

    async fn delay_ms(&mut self, millis: u32) {
        sleep(Duration::from_millis(millis as u64)).await;
    }
}

#[allow(dead_code)]
/// Host side of a link: decodes whatever the DUT writes.
pub struct HostLink {
    pub port: MockSerialPort,
    receiver: FrameReceiver,
    ready: VecDeque<Frame>,
}

#[allow(dead_code)]
impl HostLink {
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            receiver: FrameReceiver::new(),
            ready: VecDeque::new(),
        }
    }

    /// Read until the next complete frame.
    pub async fn next_frame(&mut self) -> Frame {
        let mut buf = [0u8; 32];
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return frame;
            }
            let len = self.port.read(&mut buf).await.expect("DUT port closed");
            self.ready.extend(self.receiver.push(&buf[..len]));
        }
    }

    /// Skip frames until one carries `command`.
    pub async fn next_command(&mut self, command: LinkCommand) -> Frame {
        loop {
            let frame = self.next_frame().await;
            if frame.command() == Some(command) {
                return frame;
            }
        }
    }

    pub fn send(&self, bytes: &[u8]) {
        self.port.inject(bytes);
    }
}
