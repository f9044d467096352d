//! L2: HTTP CONNECT tunnelling through a forward proxy before the TLS
//! handshake begins. `ProxyKind::Direct` skips this layer entirely.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::config::ProxyKind;
use crate::error::TransportError;
use crate::ringbuf::RingBuf;

const RESPONSE_BUF_CAPACITY: usize = 4 * 1024;
const MAX_REASON_LEN: usize = 512;
const POLL_STEP: Duration = Duration::from_secs(1);

/// Runs the CONNECT handshake over an already-open TCP stream to the
/// proxy. No-op for `ProxyKind::Direct`.
pub async fn connect_through(
    stream: &mut TcpStream,
    target_host: &str,
    target_port: u16,
    proxy: &ProxyKind,
    overall_timeout: Duration,
) -> Result<(), TransportError> {
    let (username, password) = match proxy {
        ProxyKind::Direct => return Ok(()),
        ProxyKind::Http { username, password, .. } => (username, password),
    };

    let mut request = format!(
        "CONNECT {target_host}:{target_port} HTTP/1.1\r\nHost: {target_host}:{target_port}\r\n"
    );
    if let Some(user) = username {
        let pass = password.clone().unwrap_or_default();
        let creds = BASE64.encode(format!("{user}:{pass}"));
        request.push_str(&format!("Proxy-Authorization: Basic {creds}\r\n"));
    }
    request.push_str("\r\n");

    timeout(overall_timeout, stream.write_all(request.as_bytes()))
        .await
        .map_err(|_| TransportError::TransportConnect(std::io::Error::new(std::io::ErrorKind::TimedOut, "proxy CONNECT write timed out")))?
        .map_err(TransportError::ConnDrop)?;

    let mut rx = RingBuf::with_capacity(RESPONSE_BUF_CAPACITY);
    let header_end = loop {
        let mut chunk = [0u8; 512];
        let n = timeout(POLL_STEP, stream.read(&mut chunk))
            .await
            .map_err(|_| TransportError::TransportConnect(std::io::Error::new(std::io::ErrorKind::TimedOut, "proxy CONNECT response timed out")))?
            .map_err(TransportError::ConnDrop)?;
        if n == 0 {
            return Err(TransportError::RemoteClosed);
        }
        if rx.push(&chunk[..n]).is_err() {
            return Err(TransportError::ProxyError {
                status: 0,
                reason: "proxy response exceeded 4 KiB header limit".into(),
            });
        }
        if let Some(offset) = rx.find_bytes(b"\r\n\r\n") {
            break offset + 4;
        }
    };

    let header_bytes = rx.peek(header_end);
    let header_text = String::from_utf8_lossy(&header_bytes);
    let status_line = header_text.lines().next().unwrap_or("");
    let (status, reason) = parse_status_line(status_line)?;

    if rx.bytes_available() > header_end {
        return Err(TransportError::ProxyError {
            status,
            reason: "unexpected bytes after proxy response header".into(),
        });
    }

    if status != 200 {
        return Err(TransportError::ProxyError { status, reason });
    }
    Ok(())
}

fn parse_status_line(line: &str) -> Result<(u16, String), TransportError> {
    let rest = line
        .strip_prefix("HTTP/1.1 ")
        .or_else(|| line.strip_prefix("HTTP/1.0 "))
        .ok_or_else(|| TransportError::ProxyError {
            status: 0,
            reason: format!("unrecognised status line: {line}"),
        })?;
    let status: u16 = rest
        .get(0..3)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| TransportError::ProxyError {
            status: 0,
            reason: format!("malformed status code: {line}"),
        })?;
    let reason = rest.get(4..).unwrap_or("").trim_end().chars().take(MAX_REASON_LEN).collect();
    Ok((status, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_200_connection_established() {
        let (status, reason) = parse_status_line("HTTP/1.1 200 Connection Established").unwrap();
        assert_eq!(status, 200);
        assert_eq!(reason, "Connection Established");
    }

    #[test]
    fn parses_407_proxy_auth_required() {
        let (status, reason) = parse_status_line("HTTP/1.1 407 Proxy Authentication Required").unwrap();
        assert_eq!(status, 407);
        assert_eq!(reason, "Proxy Authentication Required");
    }

    #[test]
    fn rejects_unrecognised_protocol_prefix() {
        assert!(parse_status_line("ICY 200 OK").is_err());
    }

    #[test]
    fn reason_is_capped_at_512_bytes() {
        let long_reason = "x".repeat(600);
        let line = format!("HTTP/1.1 500 {long_reason}");
        let (_, reason) = parse_status_line(&line).unwrap();
        assert_eq!(reason.len(), MAX_REASON_LEN);
    }
}
