//! gemlet Transport
//!
//! Gemini mandates TLS on every connection. This crate owns the connection
//! lifecycle (connect, send, receive, close) behind the [`Connector`] and
//! [`Connection`] traits so the navigation engine never touches a socket
//! directly, and decides certificate trust through a [`TrustStore`].

mod connection;
mod error;
mod tls;
mod trust;

pub use connection::{Connection, ConnectionGuard, Connector, ReadOutcome};
pub use error::TransportError;
pub use tls::{fingerprint, TlsConnector, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use trust::{AcceptAnyTrust, MemoryTrustStore, TrustDecision, TrustStore};

pub type Result<T> = std::result::Result<T, TransportError>;

/// Port used when a `gemini://` URL does not name one.
pub const DEFAULT_PORT: u16 = 1965;
