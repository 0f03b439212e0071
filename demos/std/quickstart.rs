//! # Quickstart Example
//!
//! Minimal example demonstrating the basics of serlink:
//! - Configure a link
//! - Encode PING and FORWARD frames
//! - Feed a noisy byte stream to the peer session
//! - Watch liveness timers expire
//!
//! This example uses `std` for a quick trial run and drives two sessions by
//! hand with simulated timestamps; no serial port is needed.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use embassy_time::{Duration, Instant};
use serlink::protocol::session::{LinkConfig, LinkSession};

fn main() {
    println!("=== serlink Quickstart ===\n");

    // ======================================================================
    // 1. Configure both ends
    // ======================================================================
    println!("1. Configuring nodes \"A\" and \"B\"");

    let config_a = LinkConfig::builder("A")
        .ping_period(Duration::from_secs(5)) // Heartbeat cadence
        .ping_receive_timeout(Duration::from_secs(10)) // Silence tolerated
        .max_payload(256) // Small UART buffers
        .build();
    let config_b = LinkConfig::builder("B").build();

    let start = Instant::from_millis(0);
    let mut node_a = LinkSession::new(config_a, start);
    let mut node_b = LinkSession::new(config_b, start);
    node_b.block_incoming("A/debug/#").expect("block list has room");
    println!("   B ignores A/debug/#\n");

    // ======================================================================
    // 2. Exchange heartbeats
    // ======================================================================
    println!("2. Exchanging heartbeats");

    let ping_a = node_a.tick(start).ping.expect("first tick always pings");
    let ping_b = node_b.tick(start).ping.expect("first tick always pings");
    print!("   PING from A: ");
    for byte in &ping_a {
        print!("{:02X} ", byte);
    }
    println!();

    for event in node_b.receive(&ping_a, start) {
        println!("   B bus <- {} = {}", event.topic, event.message);
    }
    for event in node_a.receive(&ping_b, start) {
        println!("   A bus <- {} = {}", event.topic, event.message);
    }
    println!();

    // ======================================================================
    // 3. Bridge publications through a noisy line
    // ======================================================================
    println!("3. Forwarding A's publications to B");

    let mut line = vec![0x00, 0xFF, 0x42]; // Line noise before the first frame
    for (topic, message) in [("sensor/temp", "21.5"), ("debug/heap", "4096")] {
        match node_a.forward(topic, message, "app") {
            Ok(Some(frame)) => line.extend(frame),
            Ok(None) => println!("   {} not forwarded", topic),
            Err(e) => eprintln!("   Encoding error: {:?}", e),
        }
    }

    let now = Instant::from_millis(20);
    for chunk in line.chunks(7) {
        for message in node_b.receive(chunk, now) {
            println!(
                "   B bus <- {} = {} (from {})",
                message.topic, message.message, message.originator
            );
        }
    }
    println!(
        "   B receiver: {} frames, {} dropped\n",
        node_b.receiver().frames_received(),
        node_b.receiver().frames_dropped()
    );

    // ======================================================================
    // 4. Loop prevention
    // ======================================================================
    println!("4. Offering the bridged message back to B's link");

    match node_b.forward("A/sensor/temp", "21.5", "A") {
        Ok(None) => println!("   Dropped: it came from the peer\n"),
        other => println!("   Unexpected: {:?}\n", other),
    }

    // ======================================================================
    // 5. Liveness
    // ======================================================================
    println!("5. A goes silent");

    let mut now = now;
    while node_b.is_connected() {
        now += Duration::from_millis(50);
        if let Some(event) = node_b.tick(now).event {
            println!(
                "   t = {} ms: {} = {}",
                now.as_millis(),
                event.topic,
                event.message
            );
        }
    }
}
