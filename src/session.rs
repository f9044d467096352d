//! L5: the public client handle. Owns every lower layer and drives the
//! single `service()` tick that replaces the spec's synchronous
//! `poll()` loop with `tokio::select!`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, warn};

use crate::config::{CertVerification, ConnectParams, ProxyKind, PublishPayload};
use crate::error::{ClientError, WsError};
use crate::mqtt::{MqttCodec, MqttConnState, MqttEvent};
use crate::proxy;
use crate::tls::{self, TlsSocket};
use crate::ws::{ConnState, WsClient};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub bytes_tx: u64,
    pub bytes_rx: u64,
    pub publishes_sent: u64,
    pub pubacks_received: u64,
}

type MsgCallback = Box<dyn Fn(&str, &[u8], u8) + Send + Sync>;
type PubAckCallback = Box<dyn Fn(u16) + Send + Sync>;
type ConnAckCallback = Box<dyn Fn(u8) + Send + Sync>;

/// A connected (or about-to-connect) MQTT-over-WebSocket-over-TLS
/// client. `publish`/`subscribe`/`ping`/`set_topic_alias` take `&self`
/// and are safe to call from another task while `service` is running;
/// they only touch the codec/`WsClient` queues, never the socket.
///
/// Field order doubles as the intended drop order (arena-owning codec
/// first, then the wake primitive, then the WebSocket layer, then the
/// host string, then the TLS/TCP stream last).
pub struct Session {
    mqtt: Mutex<MqttCodec>,
    notify: tokio::sync::Notify,
    ws: Mutex<WsClient>,
    host: String,
    port: u16,
    tls: Option<TlsSocket>,

    stats: Mutex<Stats>,
    disconnecting: AtomicBool,
    connect_params: Option<ConnectParams>,

    msg_cb: MsgCallback,
    puback_cb: PubAckCallback,
    connack_cb: ConnAckCallback,
}

impl Session {
    pub fn new(
        msg_cb: impl Fn(&str, &[u8], u8) + Send + Sync + 'static,
        puback_cb: impl Fn(u16) + Send + Sync + 'static,
        connack_cb: impl Fn(u8) + Send + Sync + 'static,
    ) -> Self {
        Self {
            mqtt: Mutex::new(MqttCodec::new()),
            notify: tokio::sync::Notify::new(),
            ws: Mutex::new(WsClient::new()),
            host: String::new(),
            port: 0,
            tls: None,
            stats: Mutex::new(Stats::default()),
            disconnecting: AtomicBool::new(false),
            connect_params: None,
            msg_cb: Box::new(msg_cb),
            puback_cb: Box::new(puback_cb),
            connack_cb: Box::new(connack_cb),
        }
    }

    pub fn set_max_buf_size(&mut self, bytes: usize) {
        let mut ws = self.ws.lock().unwrap();
        ws.set_buf_capacity(bytes, bytes, bytes * 4);
    }

    pub fn stats(&self) -> Stats {
        *self.stats.lock().unwrap()
    }

    /// Opens the TCP (optionally via an HTTP CONNECT proxy) + TLS +
    /// WebSocket handshake, then drives `service` until the MQTT
    /// CONNACK resolves the connection or an error surfaces.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        params: ConnectParams,
        verify: CertVerification,
        proxy: ProxyKind,
        fallback_ipv4: bool,
    ) -> Result<(), ClientError> {
        self.disconnecting.store(false, Ordering::SeqCst);
        self.host = host.to_string();
        self.port = port;

        {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.reset();
            mqtt.set_keep_alive(params.effective_keep_alive());
        }
        {
            let mut ws = self.ws.lock().unwrap();
            ws.reset();
        }

        let proxy_preconnected = match &proxy {
            ProxyKind::Direct => None,
            ProxyKind::Http {
                host: proxy_host,
                port: proxy_port,
                ..
            } => {
                let mut stream =
                    tls::connect_tcp(proxy_host, *proxy_port, CONNECT_TIMEOUT, fallback_ipv4).await?;
                proxy::connect_through(&mut stream, host, port, &proxy, CONNECT_TIMEOUT).await?;
                Some(stream)
            }
        };

        let tls = TlsSocket::connect(host, port, host, verify, CONNECT_TIMEOUT, fallback_ipv4, proxy_preconnected).await?;
        self.tls = Some(tls);

        let upgrade_request = {
            let mut ws = self.ws.lock().unwrap();
            ws.start_handshake(host, &params.ws_path)
        };
        self.write_raw(&upgrade_request).await?;

        loop {
            let established = { self.ws.lock().unwrap().conn_state == ConnState::Established };
            if established {
                break;
            }
            self.service(Some(CONNECT_TIMEOUT)).await?;
        }

        {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.generate_connect(&params)?;
        }
        self.flush_mqtt_to_ws()?;
        self.connect_params = Some(params);

        loop {
            let state = { self.mqtt.lock().unwrap().conn_state };
            match state {
                MqttConnState::Connected => break,
                MqttConnState::Error => {
                    let reason = self.mqtt.lock().unwrap().last_connack_reason;
                    return Err(ClientError::MqttServerRefused(reason));
                }
                _ => {}
            }
            self.service(Some(CONNECT_TIMEOUT)).await?;
        }
        debug!("MQTT session established with {host}:{port}");
        Ok(())
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        let tls = self.tls.as_mut().ok_or(ClientError::ConnDrop)?;
        let mut written = 0;
        while written < bytes.len() {
            let n = tls.write(&bytes[written..]).await.map_err(ClientError::PollFailed)?;
            if n == 0 {
                return Err(ClientError::ConnDrop);
            }
            written += n;
        }
        let mut stats = self.stats.lock().unwrap();
        stats.bytes_tx += bytes.len() as u64;
        Ok(())
    }

    /// One tick of the event loop: races a socket read, the wake
    /// notifier, and the earlier of the caller's timeout or the
    /// keep-alive deadline, then drives `WsClient`/`MqttCodec` and
    /// flushes whatever became ready to send.
    pub async fn service(&mut self, timeout: Option<Duration>) -> Result<(), ClientError> {
        let ping_deadline = { self.mqtt.lock().unwrap().next_ping_deadline() };
        let wait_deadline = match timeout {
            Some(t) => ping_deadline.min(std::time::Instant::now() + t),
            None => ping_deadline,
        };
        let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(wait_deadline));
        tokio::pin!(sleep);

        let tls = self.tls.as_mut().ok_or(ClientError::ConnDrop)?;
        let mut read_buf = [0u8; READ_CHUNK];

        tokio::select! {
            res = tls.read(&mut read_buf) => {
                match res {
                    Ok(0) => return Err(ClientError::RemoteClosed),
                    Ok(n) => {
                        {
                            let mut stats = self.stats.lock().unwrap();
                            stats.bytes_rx += n as u64;
                        }
                        {
                            let mut ws = self.ws.lock().unwrap();
                            ws.rx_buf.push(&read_buf[..n]).map_err(|_| ClientError::NoMem)?;
                            ws.process()?;
                        }
                        self.pump_mqtt()?;
                    }
                    Err(e) => return Err(ClientError::PollFailed(e)),
                }
            }
            _ = self.notify.notified() => {}
            _ = &mut sleep => {
                let mut mqtt = self.mqtt.lock().unwrap();
                if mqtt.check_ping_timeout() {
                    return Err(ClientError::PingTimeout);
                }
                if std::time::Instant::now() >= ping_deadline {
                    mqtt.generate_pingreq();
                } else if timeout.is_some() {
                    return Ok(());
                }
            }
        }

        self.flush_mqtt_to_ws()?;
        self.drain_tx().await?;
        Ok(())
    }

    fn pump_mqtt(&mut self) -> Result<(), ClientError> {
        let raw = {
            let mut ws = self.ws.lock().unwrap();
            let n = ws.to_mqtt_buf.bytes_available();
            let mut buf = vec![0u8; n];
            ws.to_mqtt_buf.pop(&mut buf);
            buf
        };
        if raw.is_empty() {
            return Ok(());
        }
        let (events, consumed) = {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.parse_incoming(&raw)?
        };
        if consumed < raw.len() {
            let mut ws = self.ws.lock().unwrap();
            ws.to_mqtt_buf
                .push(&raw[consumed..])
                .map_err(|_| ClientError::NoMem)?;
        }
        for event in events {
            self.handle_mqtt_event(event)?;
        }
        Ok(())
    }

    fn handle_mqtt_event(&mut self, event: MqttEvent) -> Result<(), ClientError> {
        match event {
            MqttEvent::ConnAck { reason_code, session_present } => {
                (self.connack_cb)(reason_code);
                if reason_code != 0 {
                    let mut mqtt = self.mqtt.lock().unwrap();
                    mqtt.conn_state = MqttConnState::Error;
                    return Err(ClientError::MqttServerRefused(reason_code));
                }
                debug!("CONNACK ok, session_present={session_present}");
            }
            MqttEvent::PubAck { packet_id, reason_code } => {
                if reason_code != 0 {
                    warn!("PUBACK for {packet_id} carried a non-success reason code {reason_code:#x}");
                }
                (self.puback_cb)(packet_id);
                let mut stats = self.stats.lock().unwrap();
                stats.pubacks_received += 1;
            }
            MqttEvent::SubAck { packet_id, reason_codes } => {
                debug!("SUBACK for {packet_id}: {reason_codes:?}");
            }
            MqttEvent::Publish { topic, payload, qos, packet_id } => {
                (self.msg_cb)(&topic, &payload, qos);
                if qos == 1 {
                    let id = packet_id.ok_or_else(|| {
                        ClientError::ProtoMqtt(crate::error::MqttError::Malformed(
                            "QoS 1 PUBLISH missing packet id".into(),
                        ))
                    })?;
                    let mut mqtt = self.mqtt.lock().unwrap();
                    mqtt.generate_puback(id, 0)?;
                }
            }
            MqttEvent::PingResp => {
                debug!("PINGRESP received");
            }
            MqttEvent::Disconnect { reason_code, reason_string } => {
                warn!("broker sent DISCONNECT reason={reason_code:#x} {reason_string:?}");
                return Err(ClientError::RemoteClosed);
            }
        }
        Ok(())
    }

    fn flush_mqtt_to_ws(&mut self) -> Result<(), ClientError> {
        let mut packets = {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.drain_outbound()
        };
        let mut requeued = Vec::new();
        {
            let mut ws = self.ws.lock().unwrap();
            while !packets.is_empty() {
                let bytes = packets.remove(0);
                match ws.queue_binary(&bytes) {
                    // queue_frame is whole-frame-or-nothing, so a
                    // successful queue always carries every byte.
                    Ok(_) => {}
                    Err(WsError::BufferFull) => {
                        requeued.push(bytes);
                        requeued.extend(packets.drain(..));
                        break;
                    }
                    Err(e) => return Err(ClientError::ProtoWs(e)),
                }
            }
        }
        if !requeued.is_empty() {
            let mut mqtt = self.mqtt.lock().unwrap();
            for bytes in requeued.into_iter().rev() {
                mqtt.requeue(bytes);
            }
        }
        Ok(())
    }

    async fn drain_tx(&mut self) -> Result<(), ClientError> {
        let tls = self.tls.as_mut().ok_or(ClientError::ConnDrop)?;
        let written = {
            let mut ws = self.ws.lock().unwrap();
            ws.drain_tx(tls).await.map_err(ClientError::PollFailed)?
        };
        if written > 0 {
            let mut stats = self.stats.lock().unwrap();
            stats.bytes_tx += written as u64;
        }
        Ok(())
    }

    pub fn publish(
        &self,
        topic: &str,
        payload: impl Into<PublishPayload>,
        qos: u8,
        retain: bool,
    ) -> Result<u16, ClientError> {
        if self.disconnecting.load(Ordering::SeqCst) {
            return Err(ClientError::Disconnecting);
        }
        let packet_id = {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.generate_publish(topic, payload.into(), qos, retain)?
        };
        {
            let mut stats = self.stats.lock().unwrap();
            stats.publishes_sent += 1;
        }
        self.notify.notify_one();
        Ok(packet_id)
    }

    pub fn subscribe(&self, topic: &str, max_qos: u8) -> Result<(), ClientError> {
        if self.disconnecting.load(Ordering::SeqCst) {
            return Err(ClientError::Disconnecting);
        }
        {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.generate_subscribe(topic, max_qos)?;
        }
        self.notify.notify_one();
        Ok(())
    }

    pub fn set_topic_alias(&self, topic: &str) -> u16 {
        let alias = {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.assign_topic_alias(topic)
        };
        self.notify.notify_one();
        alias
    }

    pub fn ping(&self) {
        {
            let mut mqtt = self.mqtt.lock().unwrap();
            mqtt.generate_pingreq();
        }
        self.notify.notify_one();
    }

    /// Flushes pending arena contents, sends MQTT `DISCONNECT` and a
    /// WebSocket `CLOSE`, then shuts the TLS/TCP stream down once.
    pub async fn disconnect(&mut self, timeout: Duration) {
        self.disconnecting.store(true, Ordering::SeqCst);
        let slice = timeout / 4;

        if self.service(Some(slice)).await.is_err() {
            // Best-effort flush; a connection already gone is fine to
            // shut down without further I/O.
        }

        {
            let mut mqtt = self.mqtt.lock().unwrap();
            let _ = mqtt.generate_disconnect(0);
        }
        {
            let mut ws = self.ws.lock().unwrap();
            let _ = ws.queue_close(1000, "");
        }

        for _ in 0..2 {
            if self.service(Some(slice)).await.is_err() {
                break;
            }
        }

        if let Some(tls) = self.tls.as_mut() {
            tls.shutdown().await;
        }
    }
}
