//! Property 2: the RFC 6455 example nonce derives the example accept
//! value. Property 3: client frames round-trip for payload lengths
//! that straddle the 125/65535 header-size thresholds.

use mqtt_wss_transport::ws::frame::{encode_client_frame_with_mask, unmask, OpCode};
use mqtt_wss_transport::ws::handshake::expected_accept;

#[test]
fn rfc6455_example_nonce_derives_example_accept() {
    let nonce = "dGhlIHNhbXBsZSBub25jZQ==";
    assert_eq!(expected_accept(nonce), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
}

#[test]
fn frame_round_trips_across_length_thresholds() {
    let mask = [0xDE, 0xAD, 0xBE, 0xEF];
    for &len in &[0usize, 1, 124, 125, 126, 65534, 65535, 65536, 65537] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        let frame = encode_client_frame_with_mask(OpCode::Binary, &payload, mask);

        assert_eq!(frame[0], 0x80 | OpCode::Binary.as_u8());
        assert_eq!(frame[1] & 0x80, 0x80, "client frames are always masked");

        let (header_len, declared_len) = if len <= 125 {
            (2, (frame[1] & 0x7F) as usize)
        } else if len <= 65535 {
            (4, u16::from_be_bytes([frame[2], frame[3]]) as usize)
        } else {
            (10, u64::from_be_bytes(frame[2..10].try_into().unwrap()) as usize)
        };
        assert_eq!(declared_len, len);

        let masked_payload = &frame[header_len + 4..];
        assert_eq!(masked_payload.len(), len);
        let recovered = unmask(masked_payload, mask);
        assert_eq!(recovered, payload);
    }
}
