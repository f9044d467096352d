//! Property 9: short-write resumption. `WsClient::drain_tx` hands the
//! socket whatever `tx_buf`'s current contiguous span is and only
//! advances the tail by what the socket actually accepted; a network
//! that accepts a handful of bytes at a time must still see the exact
//! original byte stream, once, with no re-masking or duplication.
//! `TlsSocket` can't be swapped for a mock, so this drives `tx_buf`
//! directly the way `drain_tx` would across many short writes.

use mqtt_wss_transport::ws::frame::{unmask, OpCode};
use mqtt_wss_transport::ws::WsClient;

fn header_len(payload_len: usize) -> usize {
    if payload_len <= 125 {
        2
    } else if payload_len <= 65535 {
        4
    } else {
        10
    }
}

/// Drains every byte out of `ws`'s tx buffer in chunks of at most
/// `chunk` bytes, mimicking a socket that only ever accepts a short
/// write, and returns the bytes in the order a real socket would have
/// seen them.
fn drain_in_short_writes(ws: &mut WsClient, chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let span = ws.tx_buf.linear_read_range();
        if span.is_empty() {
            break;
        }
        let take = span.len().min(chunk);
        out.extend_from_slice(&span[..take]);
        ws.tx_buf.bump_tail(take);
    }
    out
}

#[test]
fn large_frame_survives_one_byte_at_a_time_writes() {
    let mut ws = WsClient::new();
    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
    let queued = ws.queue_binary(&payload).unwrap();
    assert_eq!(queued, payload.len());

    let total_frame_bytes = header_len(payload.len()) + 4 + payload.len();
    let written = drain_in_short_writes(&mut ws, 1);
    assert_eq!(written.len(), total_frame_bytes, "no bytes lost or duplicated");

    let hlen = header_len(payload.len());
    assert_eq!(written[0], 0x80 | OpCode::Binary.as_u8());
    let mask = [written[hlen], written[hlen + 1], written[hlen + 2], written[hlen + 3]];
    let recovered = unmask(&written[hlen + 4..], mask);
    assert_eq!(recovered, payload, "payload round-trips intact across short writes");
}

#[test]
fn second_frame_queued_mid_drain_is_appended_not_interleaved() {
    let mut ws = WsClient::new();
    let first_payload = vec![0xAA; 300];
    let second_payload = vec![0xBB; 40];

    ws.queue_binary(&first_payload).unwrap();
    // Drain only part of the first frame before queuing the second, the
    // way a publish() call racing service()'s drain would.
    let partial = drain_in_short_writes_bounded(&mut ws, 7, 50);
    ws.queue_binary(&second_payload).unwrap();
    let rest = drain_in_short_writes(&mut ws, 11);

    let mut all = partial;
    all.extend(rest);

    let first_total = header_len(first_payload.len()) + 4 + first_payload.len();
    let second_total = header_len(second_payload.len()) + 4 + second_payload.len();
    assert_eq!(all.len(), first_total + second_total);

    let (first_frame, second_frame) = all.split_at(first_total);
    let hlen1 = header_len(first_payload.len());
    let mask1 = [first_frame[hlen1], first_frame[hlen1 + 1], first_frame[hlen1 + 2], first_frame[hlen1 + 3]];
    assert_eq!(unmask(&first_frame[hlen1 + 4..], mask1), first_payload);

    let hlen2 = header_len(second_payload.len());
    let mask2 = [second_frame[hlen2], second_frame[hlen2 + 1], second_frame[hlen2 + 2], second_frame[hlen2 + 3]];
    assert_eq!(unmask(&second_frame[hlen2 + 4..], mask2), second_payload);
}

/// Same as `drain_in_short_writes`, but stops once `limit` bytes have
/// been pulled so the caller can interleave other work mid-drain.
fn drain_in_short_writes_bounded(ws: &mut WsClient, chunk: usize, limit: usize) -> Vec<u8> {
    let mut out = Vec::new();
    while out.len() < limit {
        let span = ws.tx_buf.linear_read_range();
        if span.is_empty() {
            break;
        }
        let take = span.len().min(chunk).min(limit - out.len());
        out.extend_from_slice(&span[..take]);
        ws.tx_buf.bump_tail(take);
    }
    out
}
