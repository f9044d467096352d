use std::time::Duration;

/// Last Will and Testament, published by the server if the client
/// disconnects uncleanly.
#[derive(Debug, Clone)]
pub struct Will {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

/// Parameters for the MQTT CONNECT packet. Mirrors the recognised
/// option set in spec.md §6.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub clientid: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub will: Option<Will>,
    pub keep_alive: Duration,
    /// Reserved: the original code path reads this field but the
    /// newer one doesn't act on it (spec.md §9 open question). Kept
    /// for API compatibility with callers that set it.
    pub drop_on_publish_fail: bool,
    /// HTTP path used in the WebSocket upgrade request, default `/mqtt`.
    pub ws_path: String,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            clientid: String::new(),
            username: None,
            password: None,
            will: None,
            keep_alive: Duration::from_secs(400),
            drop_on_publish_fail: false,
            ws_path: "/mqtt".to_string(),
        }
    }
}

impl ConnectParams {
    /// A `Duration::ZERO` keep-alive is treated as "use the default",
    /// per spec.md §6 ("default 400s if 0").
    pub fn effective_keep_alive(&self) -> Duration {
        if self.keep_alive.is_zero() {
            Duration::from_secs(400)
        } else {
            self.keep_alive
        }
    }
}

/// Certificate verification policy for the TLS layer. Bit values match
/// spec.md §6 exactly so callers can keep their existing flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertVerification {
    Full = 0,
    AllowSelfSigned = 1,
    DontCheckCerts = 8,
}

/// Optional HTTP CONNECT proxy hop run before the TLS handshake.
#[derive(Debug, Clone)]
pub enum ProxyKind {
    Direct,
    Http {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    },
}

impl Default for ProxyKind {
    fn default() -> Self {
        ProxyKind::Direct
    }
}

/// Payload ownership hint for `Session::publish`. Large payloads are
/// moved into the arena without a second copy; small ones are always
/// copied regardless of which variant is used.
pub enum PublishPayload {
    Owned(Vec<u8>),
    CallerResponsibility(&'static [u8]),
}

impl From<Vec<u8>> for PublishPayload {
    fn from(v: Vec<u8>) -> Self {
        PublishPayload::Owned(v)
    }
}

impl From<&str> for PublishPayload {
    fn from(s: &str) -> Self {
        PublishPayload::Owned(s.as_bytes().to_vec())
    }
}

impl PublishPayload {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            PublishPayload::Owned(v) => v.as_slice(),
            PublishPayload::CallerResponsibility(s) => s,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
