//! L1: TCP + TLS client socket.
//!
//! Where a synchronous transport would poll a non-blocking fd for
//! WANT_READ/WANT_WRITE, this layer awaits short async reads/writes
//! directly — `Session::service` composes them inside `tokio::select!`
//! alongside the wake notifier and the keep-alive timer, which is the
//! idiomatic-Tokio rendition of the same readiness loop.

use std::fmt::Debug;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

use crate::config::CertVerification;
use crate::error::TransportError;

/// Accepts a depth-0 self-signed leaf (no intermediates presented) and
/// otherwise defers to the platform/webpki verifier so that a genuine
/// chain error, expiry, or name mismatch past depth 0 is still fatal.
#[derive(Debug)]
struct AllowSelfSignedVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for AllowSelfSignedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if intermediates.is_empty() {
            warn!("accepting depth-0 self-signed certificate (AllowSelfSigned policy)");
            return Ok(ServerCertVerified::assertion());
        }
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Accepts anything. Logged once per connection since this disables
/// TLS's entire security guarantee.
#[derive(Debug)]
struct NoCheckVerifier;

impl ServerCertVerifier for NoCheckVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
        ]
    }
}

fn build_tls_config(verify: CertVerification) -> Result<Arc<ClientConfig>, TransportError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = match verify {
        CertVerification::Full => ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
        CertVerification::AllowSelfSigned => {
            let webpki_verifier = WebPkiServerVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| TransportError::TlsHandshake(e.to_string()))?;
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AllowSelfSignedVerifier {
                    inner: webpki_verifier,
                }))
                .with_no_client_auth()
        }
        CertVerification::DontCheckCerts => {
            warn!("TLS certificate verification disabled (DontCheckCerts policy)");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCheckVerifier))
                .with_no_client_auth()
        }
    };
    Ok(Arc::new(config))
}

/// A connected, non-blocking TLS socket.
pub struct TlsSocket {
    stream: TlsStream<TcpStream>,
    closed: bool,
}

impl TlsSocket {
    pub async fn connect(
        target_host: &str,
        target_port: u16,
        sni_host: &str,
        verify: CertVerification,
        connect_timeout: Duration,
        fallback_ipv4: bool,
        proxy_preconnected: Option<TcpStream>,
    ) -> Result<Self, TransportError> {
        let tcp = match proxy_preconnected {
            Some(stream) => stream,
            None => connect_tcp(target_host, target_port, connect_timeout, fallback_ipv4).await?,
        };
        tcp.set_nodelay(true).ok();

        let tls_config = build_tls_config(verify)?;
        let connector = TlsConnector::from(tls_config);
        let server_name = ServerName::try_from(sni_host.to_string())
            .map_err(|e| TransportError::TlsHandshake(format!("invalid SNI host: {e}")))?;

        let stream = tokio::time::timeout(connect_timeout, connector.connect(server_name, tcp))
            .await
            .map_err(|_| TransportError::TlsHandshake("handshake timed out".into()))?
            .map_err(|e| TransportError::TlsHandshake(e.to_string()))?;

        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Reads whatever is currently available into `buf` without
    /// waiting for it to fill, mirroring `SSL_read` under a
    /// non-blocking fd: `Ok(0)` means the peer cleanly closed the
    /// connection (map to `TransportError::RemoteClosed`); this future
    /// only resolves once at least one byte is available or EOF is
    /// reached, so it composes directly with `tokio::select!` the way
    /// a `WANT_READ` poll registration would.
    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.stream.read(buf).await
    }

    /// Writes as much of `buf` as the socket currently accepts,
    /// returning the count written — a short write is the async
    /// equivalent of `SSL_ERROR_WANT_WRITE` and the caller arms
    /// POLLOUT for the remainder on the next tick.
    pub async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        use tokio::io::AsyncWriteExt;
        self.stream.write(buf).await
    }

    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        use tokio::io::AsyncWriteExt;
        let _ = self.stream.shutdown().await;
    }
}

pub(crate) async fn connect_tcp(
    host: &str,
    port: u16,
    timeout: Duration,
    fallback_ipv4: bool,
) -> Result<TcpStream, TransportError> {
    let addrs: Vec<SocketAddr> = tokio::time::timeout(timeout, tokio::net::lookup_host((host, port)))
        .await
        .map_err(|_| TransportError::TransportLookup(std::io::Error::new(std::io::ErrorKind::TimedOut, "dns timeout")))?
        .map_err(TransportError::TransportLookup)?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::TransportLookup(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no addresses resolved",
        )));
    }

    let ordered: Vec<SocketAddr> = if fallback_ipv4 {
        let mut v4: Vec<SocketAddr> = addrs.iter().filter(|a| matches!(a.ip(), IpAddr::V4(_))).cloned().collect();
        let mut v6: Vec<SocketAddr> = addrs.iter().filter(|a| matches!(a.ip(), IpAddr::V6(_))).cloned().collect();
        v6.append(&mut v4);
        v6
    } else {
        addrs
    };

    let mut last_err = None;
    for addr in &ordered {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(e)) => last_err = Some(e),
            Err(_) => {
                last_err = Some(std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timeout"))
            }
        }
    }

    // Retry once more with IPv4 addresses only, if the caller asked for
    // the fallback and we haven't already tried them first.
    if fallback_ipv4 {
        for addr in ordered.iter().filter(|a| matches!(a.ip(), IpAddr::V4(_))) {
            if let Ok(Ok(stream)) = tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
                return Ok(stream);
            }
        }
    }

    Err(TransportError::TransportConnect(
        last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "connect failed")),
    ))
}
