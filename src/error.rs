use std::io;
use thiserror::Error;

/// Errors from the bottom three layers: TCP/TLS, the optional HTTP
/// CONNECT proxy hop, and DNS resolution.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("DNS lookup failed: {0}")]
    TransportLookup(io::Error),

    #[error("TCP connect failed: {0}")]
    TransportConnect(io::Error),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("proxy CONNECT failed with status {status}: {reason}")]
    ProxyError { status: u16, reason: String },

    #[error("remote closed the connection")]
    RemoteClosed,

    #[error("connection dropped: {0}")]
    ConnDrop(io::Error),

    #[error("{source}")]
    IOError {
        #[from]
        source: io::Error,
    },
}

/// Errors from the RFC 6455 WebSocket layer.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("server did not reply with HTTP 101: {0}")]
    HandshakeStatus(u16),

    #[error("missing or invalid sec-websocket-accept header")]
    HandshakeAccept,

    #[error("handshake response exceeded the header size/count limit")]
    HandshakeTooLarge,

    #[error("RSV bits must be zero")]
    RsvNotZero,

    #[error("server frame must not be fragmented")]
    Fragmented,

    #[error("server-to-client frame must not be masked")]
    MaskedServerFrame,

    #[error("unsupported inbound opcode {0:#x}")]
    UnsupportedOpcode(u8),

    #[error("close frame payload length of 1 is invalid")]
    InvalidClosePayload,

    #[error("close reason is not valid UTF-8")]
    InvalidCloseReason,

    #[error("ping payload exceeds half the receive buffer capacity")]
    PingTooLarge,

    #[error("ring buffer has no room to queue this frame")]
    BufferFull,

    #[error("{source}")]
    IOError {
        #[from]
        source: io::Error,
    },
}

/// Errors from the MQTT 5 codec.
#[derive(Error, Debug)]
pub enum MqttError {
    #[error("bad user-supplied parameter: {0}")]
    UserError(String),

    #[error("message would exceed the negotiated maximum packet size")]
    MessageTooBig,

    #[error("arena is out of memory")]
    OutOfMemory,

    #[error("malformed variable byte integer")]
    MalformedVbi,

    #[error("value {0} exceeds the variable byte integer range")]
    VbiOutOfRange(u32),

    #[error("unknown property identifier {0:#x}")]
    UnknownProperty(u8),

    #[error("packet is truncated or malformed: {0}")]
    Malformed(String),

    #[error("topic alias {0} has no binding yet")]
    UnknownTopicAlias(u16),

    #[error("topic alias space is exhausted")]
    AliasSpaceExhausted,

    #[error("PUBACK referenced a packet id that was never sent")]
    UnknownPacketId(u16),

    #[error("not implemented: QoS 2, and rebinding an in-use topic alias")]
    NotImplemented,

    #[error("control packet type {0} is not handled")]
    NotImplementedYet(u8),

    #[error("server refused the connection, reason code {0:#x}")]
    ServerRefused(u8),
}

/// Top-level error surfaced to the `Session` caller, see spec.md §7.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("remote closed the connection")]
    RemoteClosed,

    #[error("connection dropped")]
    ConnDrop,

    #[error("MQTT protocol error: {0}")]
    ProtoMqtt(#[from] MqttError),

    #[error("WebSocket protocol error: {0}")]
    ProtoWs(#[from] WsError),

    #[error("message too big to send")]
    MsgTooBig,

    #[error("poll failed: {0}")]
    PollFailed(io::Error),

    #[error("out of memory")]
    NoMem,

    #[error("DNS lookup failed")]
    TransportLookup,

    #[error("TCP connect failed")]
    TransportConnect,

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("proxy CONNECT failed with status {status}: {reason}")]
    ProxyError { status: u16, reason: String },

    #[error("WebSocket handshake failed: {0}")]
    WsHandshake(WsError),

    #[error("server refused CONNECT, reason code {0:#x}")]
    MqttServerRefused(u8),

    #[error("no PINGRESP within the keep-alive grace period")]
    PingTimeout,

    #[error("bad configuration: {0}")]
    ConfigUserError(String),

    #[error("disconnect() already in progress, publish rejected")]
    Disconnecting,
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::TransportLookup(_) => ClientError::TransportLookup,
            TransportError::TransportConnect(_) => ClientError::TransportConnect,
            TransportError::TlsHandshake(msg) => ClientError::TlsHandshake(msg),
            TransportError::ProxyError { status, reason } => {
                ClientError::ProxyError { status, reason }
            }
            TransportError::RemoteClosed => ClientError::RemoteClosed,
            TransportError::ConnDrop(_) => ClientError::ConnDrop,
            TransportError::IOError { .. } => ClientError::ConnDrop,
        }
    }
}
