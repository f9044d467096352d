//! Property 6: topic alias state machine, both directions.
//!
//! TX: the first PUBLISH to a topic carries the full topic name plus a
//! freshly assigned alias, even when the alias was pinned ahead of time
//! via `assign_topic_alias`; subsequent PUBLISHes to the same topic
//! carry only the alias. RX: a PUBLISH binds an alias when it carries
//! both a topic and an alias; a later alias-only PUBLISH resolves
//! against the bound topic; an alias that was never bound is rejected,
//! and so is an attempt to rebind one that already is.

use mqtt_wss_transport::mqtt::codec::MqttCodec;
use mqtt_wss_transport::mqtt::properties::{encode_properties, Property};
use mqtt_wss_transport::mqtt::vbi;
use mqtt_wss_transport::mqtt::MqttEvent;
use mqtt_wss_transport::PublishPayload;

const PT_PUBLISH: u8 = 3;
const PT_CONNACK: u8 = 2;

fn build_packet(packet_type: u8, flags: u8, var_header: &[u8]) -> Vec<u8> {
    let mut out = vec![(packet_type << 4) | flags];
    out.extend(vbi::encode(var_header.len() as u32).unwrap());
    out.extend_from_slice(var_header);
    out
}

fn connack_with_alias_max(max: u16) -> Vec<u8> {
    let mut var_header = vec![0x00, 0x00]; // session_present=0, reason=0
    var_header.extend(encode_properties(&[Property::TopicAliasMaximum(max)]));
    build_packet(PT_CONNACK, 0, &var_header)
}

fn decode_publish_var_header(bytes: &[u8]) -> (String, Vec<Property>) {
    let (remaining_len, vbi_len) = vbi::decode(&bytes[1..]).unwrap();
    let var_header = &bytes[1 + vbi_len..1 + vbi_len + remaining_len as usize];
    let topic_len = u16::from_be_bytes([var_header[0], var_header[1]]) as usize;
    let topic = String::from_utf8(var_header[2..2 + topic_len].to_vec()).unwrap();
    let (props, _) = mqtt_wss_transport::mqtt::properties::parse_properties(&var_header[2 + topic_len..]).unwrap();
    (topic, props)
}

#[test]
fn tx_side_sends_full_topic_once_then_alias_only() {
    let mut codec = MqttCodec::new();
    codec.parse_incoming(&connack_with_alias_max(10)).unwrap();

    codec.generate_publish("sensors/temp", PublishPayload::from("21.0"), 0, false).unwrap();
    let first = codec.drain_outbound().remove(0);
    let (topic, props) = decode_publish_var_header(&first);
    assert_eq!(topic, "sensors/temp");
    assert!(props.iter().any(|p| matches!(p, Property::TopicAlias(1))));

    codec.generate_publish("sensors/temp", PublishPayload::from("21.5"), 0, false).unwrap();
    let second = codec.drain_outbound().remove(0);
    let (topic, props) = decode_publish_var_header(&second);
    assert_eq!(topic, "", "subsequent publish omits the topic name");
    assert!(props.iter().any(|p| matches!(p, Property::TopicAlias(1))));
}

#[test]
fn tx_side_sends_full_topic_on_first_publish_even_after_pinning_the_alias() {
    let mut codec = MqttCodec::new();
    codec.parse_incoming(&connack_with_alias_max(10)).unwrap();

    let alias = codec.assign_topic_alias("sensors/temp");

    codec.generate_publish("sensors/temp", PublishPayload::from("21.0"), 0, false).unwrap();
    let first = codec.drain_outbound().remove(0);
    let (topic, props) = decode_publish_var_header(&first);
    assert_eq!(topic, "sensors/temp", "broker has no binding yet, full topic is required");
    assert!(props.iter().any(|p| matches!(p, Property::TopicAlias(a) if *a == alias)));

    codec.generate_publish("sensors/temp", PublishPayload::from("21.5"), 0, false).unwrap();
    let second = codec.drain_outbound().remove(0);
    let (topic, _) = decode_publish_var_header(&second);
    assert_eq!(topic, "", "alias is now bound, later publishes omit the topic name");
}

fn publish_body(topic: &str, alias: Option<u16>) -> Vec<u8> {
    let mut var_header = Vec::new();
    var_header.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    var_header.extend_from_slice(topic.as_bytes());
    let props: Vec<Property> = alias.into_iter().map(Property::TopicAlias).collect();
    var_header.extend(encode_properties(&props));
    build_packet(PT_PUBLISH, 0, &var_header)
}

#[test]
fn rx_side_binds_alias_then_resolves_alias_only_publish() {
    let mut codec = MqttCodec::new();

    let (events, _) = codec.parse_incoming(&publish_body("device/42/state", Some(9))).unwrap();
    match &events[0] {
        MqttEvent::Publish { topic, .. } => assert_eq!(topic, "device/42/state"),
        other => panic!("expected Publish, got {other:?}"),
    }

    let (events, _) = codec.parse_incoming(&publish_body("", Some(9))).unwrap();
    match &events[0] {
        MqttEvent::Publish { topic, .. } => assert_eq!(topic, "device/42/state"),
        other => panic!("expected Publish, got {other:?}"),
    }
}

#[test]
fn rx_side_rejects_an_alias_that_was_never_bound() {
    let mut codec = MqttCodec::new();
    let result = codec.parse_incoming(&publish_body("", Some(42)));
    assert!(result.is_err());
}

#[test]
fn rx_side_rejects_reassigning_an_already_bound_alias() {
    let mut codec = MqttCodec::new();
    codec.parse_incoming(&publish_body("device/42/state", Some(9))).unwrap();

    let result = codec.parse_incoming(&publish_body("device/43/state", Some(9)));
    assert!(result.is_err(), "rebinding alias 9 to a different topic must be rejected");
}
