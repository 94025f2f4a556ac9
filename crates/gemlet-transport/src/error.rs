//! Transport error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("DNS resolution failed for {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No addresses for {0}")]
    NoAddress(String),

    #[error("TCP connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("Invalid server name: {0}")]
    InvalidServerName(String),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    #[error("Write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("Read timed out")]
    TimedOut,

    #[error("Connection already closed")]
    Closed,

    #[error("Trust store error: {0}")]
    Trust(String),
}
