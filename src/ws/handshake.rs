//! Client-initiated WebSocket upgrade (RFC 6455 §1.3), adapted from
//! the teacher's `handshake.rs`/`utils.rs` nonce/accept derivation.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::error::WsError;

pub(crate) const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

pub fn expected_accept(nonce_b64: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce_b64.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

pub fn build_upgrade_request(host: &str, path: &str, nonce_b64: &str) -> Vec<u8> {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {nonce_b64}\r\n\
         Origin:\r\n\
         Sec-WebSocket-Protocol: mqtt\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    )
    .into_bytes()
}

const MAX_HEADERS: usize = 128;
const MAX_HEADER_LINE: usize = 4096;

#[derive(Debug, Default)]
pub struct HandshakeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl HandshakeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a full HTTP response up to and including the blank line that
/// terminates the header block. `bytes` must already contain the
/// terminator (the caller finds it via `RingBuf::find_bytes`).
pub fn parse_handshake_response(bytes: &[u8]) -> Result<HandshakeResponse, WsError> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines = text.split("\r\n");

    let status_line = lines.next().ok_or(WsError::HandshakeTooLarge)?;
    if status_line.len() > MAX_HEADER_LINE {
        return Err(WsError::HandshakeTooLarge);
    }
    let mut parts = status_line.splitn(3, ' ');
    let _http_version = parts.next().ok_or(WsError::HandshakeStatus(0))?;
    let status: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(WsError::HandshakeStatus(0))?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if line.len() > MAX_HEADER_LINE {
            return Err(WsError::HandshakeTooLarge);
        }
        if headers.len() >= MAX_HEADERS {
            return Err(WsError::HandshakeTooLarge);
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    Ok(HandshakeResponse { status, headers })
}

pub fn validate_handshake_response(
    resp: &HandshakeResponse,
    nonce_b64: &str,
) -> Result<(), WsError> {
    if resp.status != 101 {
        return Err(WsError::HandshakeStatus(resp.status));
    }
    let accept = resp.header("sec-websocket-accept").ok_or(WsError::HandshakeAccept)?;
    if accept != expected_accept(nonce_b64) {
        return Err(WsError::HandshakeAccept);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_value_matches_rfc6455_example() {
        let nonce = "dGhlIHNhbXBsZSBub25jZQ==";
        assert_eq!(expected_accept(nonce), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn rejects_missing_accept_header() {
        let resp = HandshakeResponse {
            status: 101,
            headers: vec![("upgrade".into(), "websocket".into())],
        };
        let err = validate_handshake_response(&resp, "dGhlIHNhbXBsZSBub25jZQ==").unwrap_err();
        assert!(matches!(err, WsError::HandshakeAccept));
    }

    #[test]
    fn rejects_non_101_status() {
        let resp = HandshakeResponse {
            status: 404,
            headers: vec![],
        };
        let err = validate_handshake_response(&resp, "x").unwrap_err();
        assert!(matches!(err, WsError::HandshakeStatus(404)));
    }

    #[test]
    fn parses_status_and_headers() {
        let raw = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nSec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";
        let resp = parse_handshake_response(raw).unwrap();
        assert_eq!(resp.status, 101);
        assert_eq!(resp.header("sec-websocket-accept"), Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
    }
}
