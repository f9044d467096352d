//! Property 7: keep-alive fires at 0.75x the negotiated interval, and a
//! PINGREQ that never gets a PINGRESP times out after its 60s grace
//! window. The codec times against `std::time::Instant` directly (not
//! tokio's clock), so these assert the deadline arithmetic and the
//! already-elapsed case rather than sleeping for real minutes.

use std::time::{Duration, Instant};

use mqtt_wss_transport::mqtt::codec::MqttCodec;

#[test]
fn ping_deadline_is_three_quarters_of_keep_alive() {
    let before = Instant::now();
    let mut codec = MqttCodec::new();
    codec.set_keep_alive(Duration::from_secs(40));

    let deadline = codec.next_ping_deadline();
    let delta = deadline.duration_since(before);

    // 0.75 * 40s = 30s, plus a small tolerance for construction/test overhead.
    assert!(delta >= Duration::from_millis(29_750) && delta <= Duration::from_millis(30_250), "{delta:?}");
}

#[test]
fn pingreq_arms_a_sixty_second_timeout() {
    let before = Instant::now();
    let mut codec = MqttCodec::new();
    let _bytes = codec.generate_pingreq();

    assert!(codec.ping_pending);
    let deadline = codec.ping_timeout.expect("pingreq must arm a timeout");
    let delta = deadline.duration_since(before);
    assert!(delta >= Duration::from_millis(59_750) && delta <= Duration::from_millis(60_250), "{delta:?}");

    assert!(!codec.check_ping_timeout(), "deadline hasn't elapsed yet");
}

#[test]
fn check_ping_timeout_trips_once_the_deadline_has_passed() {
    let mut codec = MqttCodec::new();
    codec.generate_pingreq();

    // Simulate the 60s grace window having already elapsed.
    codec.ping_timeout = Some(Instant::now() - Duration::from_millis(1));
    assert!(codec.check_ping_timeout());
}

#[test]
fn pingresp_clears_the_pending_timeout() {
    let mut codec = MqttCodec::new();
    codec.generate_pingreq();
    assert!(codec.ping_pending);

    let pingresp = vec![0xD0, 0x00];
    let (events, consumed) = codec.parse_incoming(&pingresp).unwrap();
    assert_eq!(consumed, pingresp.len());
    assert_eq!(events.len(), 1);
    assert!(!codec.ping_pending);
    assert!(codec.ping_timeout.is_none());
}
