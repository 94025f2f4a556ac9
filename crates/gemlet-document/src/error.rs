//! Parse error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed status line: {0:?}")]
    MalformedStatus(String),

    #[error("Unknown status class: {0}")]
    UnknownStatusClass(u8),

    #[error("Status line exceeds {capacity} bytes (got at least {len})")]
    HeaderTooLong { len: usize, capacity: usize },

    #[error("Empty response")]
    MissingHeader,
}
