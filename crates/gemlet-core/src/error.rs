//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] gemlet_storage::StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] gemlet_transport::TransportError),

    #[error("Tab error: {0}")]
    Tab(#[from] gemlet_tabs::TabError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] gemlet_navigation::NavigationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Nothing is waiting for input")]
    NoPendingInput,

    #[error("No redirect to confirm")]
    NoPendingRedirect,
}
