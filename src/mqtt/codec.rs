//! L4: MQTT 5 control packet generation and parsing. Works entirely in
//! terms of bytes handed to/from `WsClient` — it never touches the
//! socket or the WebSocket framing itself.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::{ConnectParams, PublishPayload, Will};
use crate::error::MqttError;
use crate::mqtt::alias::{RxAliasTable, TxAliasTable};
use crate::mqtt::arena::{Arena, ChainHandle, PayloadOwner};
use crate::mqtt::properties::{encode_properties, parse_properties, Property};
use crate::mqtt::vbi;

const PT_CONNECT: u8 = 1;
const PT_CONNACK: u8 = 2;
const PT_PUBLISH: u8 = 3;
const PT_PUBACK: u8 = 4;
const PT_SUBSCRIBE: u8 = 8;
const PT_SUBACK: u8 = 9;
const PT_PINGREQ: u8 = 12;
const PT_PINGRESP: u8 = 13;
const PT_DISCONNECT: u8 = 14;

const PROTOCOL_LEVEL: u8 = 5;

/// Slack subtracted from the negotiated `MaximumPacketSize` before
/// rejecting an outbound PUBLISH, leaving room for the fixed header
/// and VBI remaining-length bytes this client doesn't precompute.
const MAX_MSG_SIZE_SLACK: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttConnState {
    Raw,
    ConnectPending,
    Connecting,
    Connected,
    Error,
    Disconnected,
}

#[derive(Debug)]
pub enum MqttEvent {
    ConnAck {
        session_present: bool,
        reason_code: u8,
    },
    PubAck {
        packet_id: u16,
        reason_code: u8,
    },
    SubAck {
        packet_id: u16,
        reason_codes: Vec<u8>,
    },
    Publish {
        topic: String,
        payload: Vec<u8>,
        qos: u8,
        packet_id: Option<u16>,
    },
    PingResp,
    Disconnect {
        reason_code: u8,
        reason_string: Option<String>,
    },
}

struct FixedHeader {
    packet_type: u8,
    flags: u8,
    remaining_length: usize,
    header_len: usize,
}

fn parse_fixed_header(bytes: &[u8]) -> Result<Option<FixedHeader>, MqttError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let first = bytes[0];
    let (remaining_length, vbi_len) = match vbi::decode(&bytes[1..]) {
        Ok(v) => v,
        Err(MqttError::MalformedVbi) if bytes.len() < 5 => return Ok(None),
        Err(e) => return Err(e),
    };
    let header_len = 1 + vbi_len;
    if bytes.len() < header_len + remaining_length as usize {
        return Ok(None);
    }
    Ok(Some(FixedHeader {
        packet_type: first >> 4,
        flags: first & 0x0F,
        remaining_length: remaining_length as usize,
        header_len,
    }))
}

fn encode_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn read_string(bytes: &[u8], pos: &mut usize) -> Result<String, MqttError> {
    let len = bytes
        .get(*pos..*pos + 2)
        .map(|s| u16::from_be_bytes([s[0], s[1]]) as usize)
        .ok_or_else(|| MqttError::Malformed("truncated string length".into()))?;
    *pos += 2;
    let slice = bytes
        .get(*pos..*pos + len)
        .ok_or_else(|| MqttError::Malformed("truncated string".into()))?;
    *pos += len;
    String::from_utf8(slice.to_vec()).map_err(|_| MqttError::Malformed("string not UTF-8".into()))
}

fn read_u16(bytes: &[u8], pos: &mut usize) -> Result<u16, MqttError> {
    let slice = bytes
        .get(*pos..*pos + 2)
        .ok_or_else(|| MqttError::Malformed("truncated u16".into()))?;
    *pos += 2;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_u8(bytes: &[u8], pos: &mut usize) -> Result<u8, MqttError> {
    let b = *bytes.get(*pos).ok_or_else(|| MqttError::Malformed("truncated byte".into()))?;
    *pos += 1;
    Ok(b)
}

fn payload_owner(bytes: Vec<u8>) -> PayloadOwner {
    PayloadOwner::Owned(bytes.into_boxed_slice())
}

/// MQTT 5 codec: packet generation backed by the fragment arena,
/// inbound packet parsing, topic-alias bookkeeping, and keep-alive
/// timing. One instance per `Session`, reset on every reconnect.
pub struct MqttCodec {
    arena: Arena,
    tx_alias: TxAliasTable,
    rx_alias: RxAliasTable,
    next_packet_id: u16,
    pending_pubacks: std::collections::HashMap<u16, ChainHandle>,
    /// Wire bytes for every packet generated so far but not yet handed
    /// to `WsClient::queue_binary`. `publish`/`subscribe`/`ping` can run
    /// on a different task than `Session::service`, so generation and
    /// draining are decoupled through this queue rather than the
    /// generator reaching into the socket directly.
    outbound: std::collections::VecDeque<Vec<u8>>,

    pub conn_state: MqttConnState,
    connect_chain: Option<ChainHandle>,
    pingreq_chain: Option<ChainHandle>,

    pub time_of_last_send: Instant,
    pub ping_pending: bool,
    pub ping_timeout: Option<Instant>,
    pub max_msg_size: Option<u32>,
    pub last_connack_reason: u8,
    keep_alive: Duration,
}

impl MqttCodec {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            tx_alias: TxAliasTable::new(0),
            rx_alias: RxAliasTable::new(),
            next_packet_id: 1,
            pending_pubacks: std::collections::HashMap::new(),
            outbound: std::collections::VecDeque::new(),
            conn_state: MqttConnState::Raw,
            connect_chain: None,
            pingreq_chain: None,
            time_of_last_send: Instant::now(),
            ping_pending: false,
            ping_timeout: None,
            max_msg_size: None,
            last_connack_reason: 0,
            keep_alive: Duration::from_secs(400),
        }
    }

    /// Clean-start reset for a fresh `connect()`: clears alias tables
    /// and outstanding PUBACK tracking, but keeps the arena (its slots
    /// get GC'd naturally as old chains are marked consumed).
    pub fn reset(&mut self) {
        self.tx_alias.reset();
        self.rx_alias.reset();
        self.next_packet_id = 1;
        self.pending_pubacks.clear();
        self.conn_state = MqttConnState::Raw;
        self.connect_chain = None;
        self.ping_pending = false;
        self.ping_timeout = None;
        self.max_msg_size = None;
        self.time_of_last_send = Instant::now();
        self.outbound.clear();
    }

    /// Drains every packet generated since the last drain, in
    /// generation order, for `Session::service` to hand to `WsClient`.
    pub fn drain_outbound(&mut self) -> Vec<Vec<u8>> {
        self.outbound.drain(..).collect()
    }

    /// Puts a packet back at the front of the outbound queue; used
    /// when `WsClient::queue_binary` reports backpressure so the same
    /// bytes are retried, in order, on the next tick.
    pub fn requeue(&mut self, bytes: Vec<u8>) {
        self.outbound.push_front(bytes);
    }

    /// Assigns (or reuses) a topic alias eagerly, for callers that want
    /// to pin an alias ahead of the first `publish()` to that topic.
    pub fn assign_topic_alias(&mut self, topic: &str) -> u16 {
        if let Some(alias) = self.tx_alias.alias_of(topic) {
            return alias;
        }
        self.tx_alias.assign(topic).unwrap_or(0)
    }

    fn alloc_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        self.next_packet_id = if self.next_packet_id == u16::MAX {
            1
        } else {
            self.next_packet_id + 1
        };
        id
    }

    fn mark_sent(&mut self) {
        self.time_of_last_send = Instant::now();
    }

    pub fn next_ping_deadline(&self) -> Instant {
        self.time_of_last_send + self.keep_alive.mul_f64(0.75)
    }

    pub fn set_keep_alive(&mut self, keep_alive: Duration) {
        self.keep_alive = keep_alive;
    }

    // ---- generation -----------------------------------------------

    pub fn generate_connect(&mut self, params: &ConnectParams) -> Result<Vec<u8>, MqttError> {
        if let Some(will) = &params.will {
            validate_will(will)?;
        }

        let mut var_header = Vec::new();
        encode_string(&mut var_header, "MQTT");
        var_header.push(PROTOCOL_LEVEL);

        let mut flags = 0x02u8; // clean start always set; no persistent sessions
        if params.will.is_some() {
            flags |= 0x04;
        }
        if let Some(will) = &params.will {
            flags |= (will.qos & 0x03) << 3;
            if will.retain {
                flags |= 0x20;
            }
        }
        if params.username.is_some() {
            flags |= 0x80;
        }
        if params.password.is_some() {
            flags |= 0x40;
        }
        var_header.push(flags);
        var_header.extend_from_slice(&(params.effective_keep_alive().as_secs() as u16).to_be_bytes());

        let mut props = vec![Property::TopicAliasMaximum(65535)];
        if let Some(max) = self.max_msg_size {
            props.push(Property::MaximumPacketSize(max));
        }
        var_header.extend(encode_properties(&props));

        let mut payload = Vec::new();
        encode_string(&mut payload, &params.clientid);
        if let Some(will) = &params.will {
            let will_props = encode_properties(&[]);
            payload.extend(will_props);
            encode_string(&mut payload, &will.topic);
            payload.extend_from_slice(&(will.payload.len() as u16).to_be_bytes());
            payload.extend_from_slice(&will.payload);
        }
        if let Some(username) = &params.username {
            encode_string(&mut payload, username);
        }
        if let Some(password) = &params.password {
            encode_string(&mut payload, password);
        }

        let bytes = self.build_packet(PT_CONNECT, 0, &var_header, &payload)?;
        self.connect_chain = Some(self.arena.new_chain(payload_owner(bytes.clone())));
        self.conn_state = MqttConnState::ConnectPending;
        self.mark_sent();
        self.outbound.push_back(bytes.clone());
        Ok(bytes)
    }

    pub fn generate_publish(
        &mut self,
        topic: &str,
        payload: PublishPayload,
        qos: u8,
        retain: bool,
    ) -> Result<u16, MqttError> {
        let payload_bytes = payload.as_slice();
        if let Some(max) = self.max_msg_size {
            let estimate = topic.len() + payload_bytes.len() + 16;
            if estimate as u32 + MAX_MSG_SIZE_SLACK > max {
                return Err(MqttError::MessageTooBig);
            }
        }

        let (topic_in_header, alias_prop) = match self.tx_alias.lookup_for_publish(topic) {
            // An alias that has already carried a topic name once can be
            // referenced by id alone from here on.
            Some((alias, false)) => (String::new(), Some(Property::TopicAlias(alias))),
            // First use of an alias, including one pinned ahead of time
            // via assign_topic_alias, still needs the full topic name so
            // the broker has something to bind the id to.
            Some((alias, true)) => (topic.to_string(), Some(Property::TopicAlias(alias))),
            None => match self.tx_alias.assign(topic) {
                Ok(alias) => {
                    // Mark it used immediately: this PUBLISH is already
                    // sending the full topic, so a later one must not.
                    self.tx_alias.lookup_for_publish(topic);
                    (topic.to_string(), Some(Property::TopicAlias(alias)))
                }
                Err(_) => (topic.to_string(), None),
            },
        };

        let packet_id = if qos > 0 { self.alloc_packet_id() } else { 0 };

        let mut var_header = Vec::new();
        encode_string(&mut var_header, &topic_in_header);
        if qos > 0 {
            var_header.extend_from_slice(&packet_id.to_be_bytes());
        }
        let props: Vec<Property> = alias_prop.into_iter().collect();
        var_header.extend(encode_properties(&props));

        let flags = ((qos & 0x03) << 1) | if retain { 0x01 } else { 0x00 };
        let bytes = self.build_packet(PT_PUBLISH, flags, &var_header, payload_bytes)?;
        self.outbound.push_back(bytes.clone());

        // The arena chain here tracks this packet for PUBACK-driven
        // reclamation; it does not avoid the copy already made above.
        // `bytes` is cloned into `outbound` and the original moved in
        // as a single `Owned` fragment, so large payloads are held
        // twice for the lifetime of the packet in outbound.
        let chain = self.arena.new_chain(payload_owner(bytes));

        if qos == 0 {
            self.arena.mark_consumed(chain);
        } else {
            self.pending_pubacks.insert(packet_id, chain);
        }
        self.mark_sent();
        Ok(packet_id)
    }

    pub fn generate_subscribe(&mut self, topic: &str, qos: u8) -> Result<u16, MqttError> {
        let packet_id = self.alloc_packet_id();
        let mut var_header = Vec::new();
        var_header.extend_from_slice(&packet_id.to_be_bytes());
        var_header.extend(encode_properties(&[]));

        let mut payload = Vec::new();
        encode_string(&mut payload, topic);
        payload.push(qos & 0x03);

        let bytes = self.build_packet(PT_SUBSCRIBE, 0x02, &var_header, &payload)?;
        self.outbound.push_back(bytes.clone());
        let chain = self.arena.new_chain(payload_owner(bytes));
        self.arena.mark_consumed(chain);
        self.mark_sent();
        Ok(packet_id)
    }

    pub fn generate_disconnect(&mut self, reason_code: u8) -> Result<Vec<u8>, MqttError> {
        let var_header = vec![reason_code];
        let bytes = self.build_packet(PT_DISCONNECT, 0, &var_header, &[])?;
        self.outbound.push_back(bytes.clone());
        let chain = self.arena.new_chain(payload_owner(bytes.clone()));
        self.arena.mark_consumed(chain);
        self.conn_state = MqttConnState::Disconnected;
        self.mark_sent();
        Ok(bytes)
    }

    pub fn generate_puback(&mut self, packet_id: u16, reason_code: u8) -> Result<Vec<u8>, MqttError> {
        let mut var_header = Vec::new();
        var_header.extend_from_slice(&packet_id.to_be_bytes());
        var_header.push(reason_code);
        let bytes = self.build_packet(PT_PUBACK, 0, &var_header, &[])?;
        self.outbound.push_back(bytes.clone());
        let chain = self.arena.new_chain(payload_owner(bytes.clone()));
        self.arena.mark_consumed(chain);
        self.mark_sent();
        Ok(bytes)
    }

    /// PINGREQ never changes; build it once and hand back the same
    /// bytes on every subsequent call.
    pub fn generate_pingreq(&mut self) -> Vec<u8> {
        if self.pingreq_chain.is_none() {
            let bytes = vec![PT_PINGREQ << 4, 0x00];
            let chain = self.arena.new_chain(payload_owner(bytes));
            self.pingreq_chain = Some(chain);
        }
        self.ping_pending = true;
        self.ping_timeout = Some(Instant::now() + Duration::from_secs(60));
        self.mark_sent();
        let bytes = self.arena.flatten(self.pingreq_chain.unwrap());
        self.outbound.push_back(bytes.clone());
        bytes
    }

    pub fn check_ping_timeout(&self) -> bool {
        match self.ping_timeout {
            Some(deadline) => self.ping_pending && Instant::now() >= deadline,
            None => false,
        }
    }

    pub fn gc(&mut self) {
        self.arena.gc_if_needed();
    }

    /// Fraction of arena slots that are reclaimable right now. Exposed
    /// for tests exercising the PUBACK-driven reclamation path; not
    /// used by `Session` itself.
    pub fn arena_reclaimable_fraction(&self) -> f64 {
        self.arena.reclaimable_fraction()
    }

    fn build_packet(&self, packet_type: u8, flags: u8, var_header: &[u8], payload: &[u8]) -> Result<Vec<u8>, MqttError> {
        let remaining_length = var_header.len() + payload.len();
        let mut out = Vec::with_capacity(2 + remaining_length);
        out.push((packet_type << 4) | flags);
        out.extend(vbi::encode(remaining_length as u32)?);
        out.extend_from_slice(var_header);
        out.extend_from_slice(payload);
        Ok(out)
    }

    // ---- parsing ----------------------------------------------------

    /// Consumes as many complete packets as `bytes` holds, returning
    /// the parsed events and the number of bytes consumed.
    pub fn parse_incoming(&mut self, bytes: &[u8]) -> Result<(Vec<MqttEvent>, usize), MqttError> {
        let mut events = Vec::new();
        let mut offset = 0;
        loop {
            let header = match parse_fixed_header(&bytes[offset..])? {
                Some(h) => h,
                None => break,
            };
            let body_start = offset + header.header_len;
            let body_end = body_start + header.remaining_length;
            let body = &bytes[body_start..body_end];
            if let Some(event) = self.dispatch_packet(header.packet_type, header.flags, body)? {
                events.push(event);
            }
            offset = body_end;
        }
        Ok((events, offset))
    }

    fn dispatch_packet(&mut self, packet_type: u8, flags: u8, body: &[u8]) -> Result<Option<MqttEvent>, MqttError> {
        match packet_type {
            PT_CONNACK => Ok(Some(self.parse_connack(body)?)),
            PT_PUBACK => Ok(Some(self.parse_puback(body)?)),
            PT_SUBACK => Ok(Some(parse_suback(body)?)),
            PT_PUBLISH => Ok(Some(self.parse_publish(flags, body)?)),
            PT_PINGRESP => {
                self.ping_pending = false;
                self.ping_timeout = None;
                Ok(Some(MqttEvent::PingResp))
            }
            PT_DISCONNECT => Ok(Some(parse_disconnect(body)?)),
            other => {
                warn!("ignoring unhandled inbound control packet type {other}");
                Err(MqttError::NotImplementedYet(other))
            }
        }
    }

    fn parse_connack(&mut self, body: &[u8]) -> Result<MqttEvent, MqttError> {
        let mut pos = 0;
        let ack_flags = read_u8(body, &mut pos)?;
        let reason_code = read_u8(body, &mut pos)?;
        let (props, _) = parse_properties(&body[pos..])?;
        for prop in &props {
            match prop {
                Property::TopicAliasMaximum(max) => self.tx_alias.set_max(*max),
                Property::MaximumPacketSize(max) => self.max_msg_size = Some(*max),
                Property::ServerKeepAlive(secs) => self.keep_alive = Duration::from_secs(*secs as u64),
                _ => {}
            }
        }
        self.last_connack_reason = reason_code;
        if reason_code == 0 {
            self.conn_state = MqttConnState::Connected;
            if let Some(chain) = self.connect_chain.take() {
                self.arena.mark_consumed(chain);
            }
        } else {
            self.conn_state = MqttConnState::Error;
        }
        debug!("CONNACK reason_code={reason_code:#x} session_present={}", ack_flags & 0x01 != 0);
        Ok(MqttEvent::ConnAck {
            session_present: ack_flags & 0x01 != 0,
            reason_code,
        })
    }

    fn parse_puback(&mut self, body: &[u8]) -> Result<MqttEvent, MqttError> {
        let mut pos = 0;
        let packet_id = read_u16(body, &mut pos)?;
        let reason_code = if body.len() > 2 { read_u8(body, &mut pos)? } else { 0 };
        match self.pending_pubacks.remove(&packet_id) {
            Some(chain) => self.arena.mark_consumed(chain),
            None => return Err(MqttError::UnknownPacketId(packet_id)),
        }
        Ok(MqttEvent::PubAck { packet_id, reason_code })
    }

    fn parse_publish(&mut self, flags: u8, body: &[u8]) -> Result<MqttEvent, MqttError> {
        let qos = (flags >> 1) & 0x03;
        let mut pos = 0;
        let topic_name = read_string(body, &mut pos)?;
        let packet_id = if qos > 0 { Some(read_u16(body, &mut pos)?) } else { None };
        let (props, props_len) = parse_properties(&body[pos..])?;
        pos += props_len;

        let alias = props.iter().find_map(|p| match p {
            Property::TopicAlias(a) => Some(*a),
            _ => None,
        });
        let topic_opt = if topic_name.is_empty() { None } else { Some(topic_name.as_str()) };
        let topic = self.rx_alias.resolve(topic_opt, alias)?;

        Ok(MqttEvent::Publish {
            topic,
            payload: body[pos..].to_vec(),
            qos,
            packet_id,
        })
    }
}

fn parse_suback(body: &[u8]) -> Result<MqttEvent, MqttError> {
    let mut pos = 0;
    let packet_id = read_u16(body, &mut pos)?;
    let (_, props_len) = parse_properties(&body[pos..])?;
    pos += props_len;
    Ok(MqttEvent::SubAck {
        packet_id,
        reason_codes: body[pos..].to_vec(),
    })
}

fn parse_disconnect(body: &[u8]) -> Result<MqttEvent, MqttError> {
    if body.is_empty() {
        return Ok(MqttEvent::Disconnect {
            reason_code: 0,
            reason_string: None,
        });
    }
    let mut pos = 0;
    let reason_code = read_u8(body, &mut pos)?;
    let reason_string = if body.len() > 1 {
        let (props, _) = parse_properties(&body[pos..])?;
        props.into_iter().find_map(|p| match p {
            Property::ReasonString(s) => Some(s),
            _ => None,
        })
    } else {
        None
    };
    Ok(MqttEvent::Disconnect {
        reason_code,
        reason_string,
    })
}

fn validate_will(will: &Will) -> Result<(), MqttError> {
    if will.topic.is_empty() {
        return Err(MqttError::UserError("will topic must not be empty".into()));
    }
    if will.qos > 1 {
        return Err(MqttError::NotImplemented);
    }
    Ok(())
}

impl Default for MqttCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectParams;

    #[test]
    fn connect_wire_shape_has_mqtt_protocol_name_and_level_five() {
        let mut codec = MqttCodec::new();
        let params = ConnectParams {
            clientid: "probe-1".into(),
            ..Default::default()
        };
        let bytes = codec.generate_connect(&params).unwrap();
        assert_eq!(bytes[0] >> 4, PT_CONNECT);
        let (remaining_len, vbi_len) = vbi::decode(&bytes[1..]).unwrap();
        assert_eq!(bytes.len(), 1 + vbi_len + remaining_len as usize);
        let var_header = &bytes[1 + vbi_len..];
        assert_eq!(&var_header[2..6], b"MQTT");
        assert_eq!(var_header[6], PROTOCOL_LEVEL);
        assert_eq!(codec.conn_state, MqttConnState::ConnectPending);
    }

    #[test]
    fn publish_qos0_is_marked_consumed_immediately() {
        let mut codec = MqttCodec::new();
        let id = codec.generate_publish("a/b", PublishPayload::from("hi"), 0, false).unwrap();
        assert_eq!(id, 0);
        assert!(codec.pending_pubacks.is_empty());
    }

    #[test]
    fn puback_reclaims_pending_qos1_publish() {
        let mut codec = MqttCodec::new();
        let id = codec.generate_publish("a/b", PublishPayload::from("hi"), 1, false).unwrap();
        assert!(codec.pending_pubacks.contains_key(&id));
        let mut puback_body = Vec::new();
        puback_body.extend_from_slice(&id.to_be_bytes());
        let event = codec.parse_puback(&puback_body).unwrap();
        assert!(matches!(event, MqttEvent::PubAck { .. }));
        assert!(!codec.pending_pubacks.contains_key(&id));
    }

    #[test]
    fn connack_success_advances_state_and_adopts_topic_alias_max() {
        let mut codec = MqttCodec::new();
        let props = encode_properties(&[Property::TopicAliasMaximum(10)]);
        let mut body = vec![0x00, 0x00];
        body.extend(props);
        let event = codec.parse_connack(&body).unwrap();
        assert!(matches!(event, MqttEvent::ConnAck { reason_code: 0, .. }));
        assert_eq!(codec.conn_state, MqttConnState::Connected);
        assert_eq!(codec.tx_alias.max(), 10);
    }

    #[test]
    fn pingreq_is_built_once_and_reused() {
        let mut codec = MqttCodec::new();
        let first = codec.generate_pingreq();
        assert_eq!(first, vec![PT_PINGREQ << 4, 0x00]);
        assert!(codec.ping_pending);
        codec.ping_pending = false;
        let second = codec.generate_pingreq();
        assert_eq!(first, second);
    }

    #[test]
    fn publish_reuses_alias_after_first_assignment() {
        let mut codec = MqttCodec::new();
        codec.tx_alias.set_max(5);
        codec.generate_publish("sensors/a", PublishPayload::from("1"), 0, false).unwrap();
        // Second publish to the same topic should reuse the alias
        // rather than erroring, exercised indirectly via no panic/err.
        codec.generate_publish("sensors/a", PublishPayload::from("2"), 0, false).unwrap();
    }
}
