//! A client-side transport that carries MQTT 5 over a masked
//! WebSocket (RFC 6455) tunnel wrapped in TLS.
//!
//! Layers compose bottom to top: [`ringbuf`] is the fixed-capacity
//! buffer every other layer reads and writes through; [`tls`] is the
//! TCP+TLS socket; [`proxy`] runs the optional HTTP CONNECT hop before
//! the handshake; [`ws`] is the RFC 6455 client; [`mqtt`] is the MQTT 5
//! codec; [`session`] ties all of it together behind one handle.

pub mod config;
pub mod error;
pub mod mqtt;
pub mod proxy;
pub mod ringbuf;
pub mod session;
pub mod tls;
pub mod ws;

pub use config::{CertVerification, ConnectParams, ProxyKind, PublishPayload, Will};
pub use error::ClientError;
pub use session::Session;
