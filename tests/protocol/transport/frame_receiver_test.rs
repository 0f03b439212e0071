//! Stream-level tests for the frame builder and receiver working together.
//!
//! Each test follows the pattern: encode → mangle or split the byte stream →
//! feed the receiver → compare what comes out with what went in.
use serlink::core::{LinkCommand, EOT, ETX, FRAME_OVERHEAD, SOH, STX};
use serlink::error::DropReason;
use serlink::infra::codec::payload::{encode_forward, ForwardPayload, PingPayload};
use serlink::protocol::transport::frame_builder::FrameBuilder;
use serlink::protocol::transport::frame_receiver::{
    decode_frame, FrameReceiver, LinkState, ReceiveResult,
};
use serlink::protocol::transport::DEFAULT_MAX_PAYLOAD;

fn forward(builder: &mut FrameBuilder, topic: &str, message: &str) -> Vec<u8> {
    let payload = encode_forward(topic, message).expect("valid forward");
    builder
        .encode(LinkCommand::Forward, &payload)
        .expect("frame fits")
}

/// Forward frame whose payload is exactly `len` bytes (`len >= 3`).
fn forward_of_len(builder: &mut FrameBuilder, len: usize) -> Vec<u8> {
    forward(builder, "t", &"m".repeat(len - 3))
}

/// Payload lengths whose length bytes collide with marker values: low byte
/// `STX`, or high byte `SOH`, `STX` or `EOT`.
fn marker_lengths() -> impl Iterator<Item = usize> {
    (3..=DEFAULT_MAX_PAYLOAD).filter(|len| len % 256 == 2 || matches!(len >> 8, 1 | 2 | 4))
}

//==================================================================================
// STREAM DELIVERY
//==================================================================================

#[test]
/// Every split point of a two-frame stream yields the same two frames.
fn test_any_chunking_yields_same_frames() {
    let mut builder = FrameBuilder::new();
    let mut stream = forward(&mut builder, "sensor/temp", "21.5");
    stream.push(SOH);
    stream.extend(forward_of_len(&mut builder, 514));
    stream.extend(forward(&mut builder, "sensor/hum", "40"));

    for split in 0..=stream.len() {
        let mut receiver = FrameReceiver::new();
        let mut frames = receiver.push(&stream[..split]);
        frames.extend(receiver.push(&stream[split..]));

        assert_eq!(frames.len(), 3, "split at {split}");
        assert_eq!(frames[0].sequence, 0);
        assert_eq!(frames[1].payload.len(), 514);
        assert_eq!(frames[2].sequence, 2);
        assert_eq!(
            ForwardPayload::from_bytes(&frames[2].payload).unwrap(),
            ForwardPayload::new("sensor/hum", "40")
        );
        assert!(receiver.is_idle());
    }
}

#[test]
/// Frames whose length bytes look like markers survive a stray start byte,
/// whatever the read size.
fn test_marker_lengths_survive_stray_start_byte() {
    for len in marker_lengths() {
        let mut builder = FrameBuilder::new();
        let frame = forward_of_len(&mut builder, len);

        for lead in [&[][..], &[SOH][..]] {
            let mut stream = lead.to_vec();
            stream.extend_from_slice(&frame);

            for chunk in [1, 64] {
                let mut receiver = FrameReceiver::new();
                let frames: Vec<_> = stream
                    .chunks(chunk)
                    .flat_map(|piece| receiver.push(piece))
                    .collect();
                assert_eq!(frames.len(), 1, "len {len}, lead {lead:?}, chunk {chunk}");
                assert_eq!(frames[0].payload.len(), len);
                assert_eq!(frames[0].command(), Some(LinkCommand::Forward));
            }
        }
    }
}

#[test]
/// Marker values inside the payload are data, not framing.
fn test_marker_bytes_inside_payload() {
    let mut builder = FrameBuilder::new();
    let payload = [SOH, STX, ETX, EOT, SOH, SOH, 0xFF];
    let frame = builder.encode(LinkCommand::Forward, &payload).unwrap();

    let decoded = decode_frame(&frame, DEFAULT_MAX_PAYLOAD).unwrap();
    assert_eq!(decoded.payload, payload);
}

#[test]
/// Line noise between frames is skipped without losing either frame.
fn test_noise_between_frames() {
    let mut builder = FrameBuilder::new();
    let mut stream = vec![0x55, 0xAA, 0x00, EOT];
    stream.extend(forward(&mut builder, "a", "1"));
    stream.extend([0x7F, ETX, STX]);
    stream.extend(forward(&mut builder, "b", "2"));

    let mut receiver = FrameReceiver::new();
    let frames = receiver.push(&stream);
    assert_eq!(frames.len(), 2);
    assert_eq!(receiver.frames_received(), 2);
    assert_eq!(receiver.frames_dropped(), 0);
}

#[test]
/// A frame abandoned mid-way is discarded by `reset`; the next frame decodes.
fn test_truncated_frame_then_valid_frame() {
    let mut builder = FrameBuilder::new();
    let first = forward(&mut builder, "lost/topic", "gone");
    let second = forward(&mut builder, "kept/topic", "here");

    let mut receiver = FrameReceiver::new();
    assert!(receiver.push(&first[..first.len() - 4]).is_empty());
    assert_eq!(receiver.state(), LinkState::Payload);
    assert!(receiver.reset());

    let frames = receiver.push(&second);
    assert_eq!(frames.len(), 1);
    assert_eq!(
        ForwardPayload::from_bytes(&frames[0].payload).unwrap().topic,
        "kept/topic"
    );
    assert_eq!(receiver.frames_dropped(), 1);
}

//==================================================================================
// CORRUPTION
//==================================================================================

#[test]
/// Flipping any single bit between SOH and EOT never yields a wrong frame.
fn test_single_bit_flips_are_rejected() {
    for len in [8, 258, DEFAULT_MAX_PAYLOAD] {
        let mut builder = FrameBuilder::new();
        let frame = forward_of_len(&mut builder, len);
        let payload = &frame[7..frame.len() - 3];

        for index in 1..frame.len() {
            for bit in 0..8 {
                let mut corrupt = frame.clone();
                corrupt[index] ^= 1 << bit;
                let mut receiver = FrameReceiver::new();
                let frames = receiver.push(&corrupt);
                assert!(
                    frames.iter().all(|decoded| decoded.payload == payload),
                    "len {len}: byte {index} bit {bit} produced a corrupt frame"
                );
            }
        }
    }
}

#[test]
/// A checksum failure is reported and the receiver returns to idle.
fn test_checksum_failure_reported() {
    let mut builder = FrameBuilder::new();
    let mut frame = forward(&mut builder, "t", "m");
    let crc_index = frame.len() - 2;
    frame[crc_index] ^= 0xFF;

    let mut receiver = FrameReceiver::new();
    let mut last = ReceiveResult::Ignored;
    for byte in &frame {
        last = receiver.push_byte(*byte);
    }
    assert!(matches!(
        last,
        ReceiveResult::Dropped(DropReason::ChecksumMismatch { .. })
    ));
    assert_eq!(receiver.state(), LinkState::Sync);
}

#[test]
/// Declared lengths above the configured bound are refused before buffering.
fn test_length_bound_applies_to_receiver() {
    let mut builder = FrameBuilder::new();
    let frame = builder
        .encode(LinkCommand::Forward, &[0x20; 64])
        .unwrap();

    assert_eq!(
        decode_frame(&frame, 32),
        Err(DropReason::PayloadTooLarge { len: 64, max: 32 })
    );
    assert_eq!(decode_frame(&frame, 64).unwrap().payload.len(), 64);
}

//==================================================================================
// PING
//==================================================================================

#[test]
/// A PING frame carries the uptime and node name.
fn test_ping_frame_contents() {
    let mut builder = FrameBuilder::new().with_sequence(0xFF);
    let payload = PingPayload::new(123_456, "gateway").to_bytes();
    let frame = builder.encode(LinkCommand::Ping, &payload).unwrap();
    assert_eq!(frame.len(), payload.len() + FRAME_OVERHEAD);
    assert_eq!(builder.next_sequence(), 0x00);

    let decoded = decode_frame(&frame, DEFAULT_MAX_PAYLOAD).unwrap();
    assert_eq!(decoded.sequence, 0xFF);
    assert_eq!(decoded.command(), Some(LinkCommand::Ping));
    let ping = PingPayload::from_bytes(&decoded.payload).unwrap();
    assert_eq!(ping.timestamp, Some(123_456));
    assert_eq!(ping.name, "gateway");
}
