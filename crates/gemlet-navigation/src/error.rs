//! Navigation error types

use gemlet_document::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Invalid response: {0}")]
    Parse(#[from] ParseError),

    #[error("Malformed redirect from {from} to {target:?}")]
    MalformedRedirect { from: String, target: String },

    #[error("Certificate for {host}:{port} changed (pinned {pinned}, got {presented})")]
    UntrustedCertificate {
        host: String,
        port: u16,
        pinned: String,
        presented: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No link numbered {0}")]
    NoSuchLink(usize),
}
