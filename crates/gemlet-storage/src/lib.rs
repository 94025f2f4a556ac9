//! gemlet Storage Layer
//!
//! SQLite-based persistence for the pieces of browser state that outlive a
//! process: user settings and the trust-on-first-use certificate pins.

mod database;
mod error;
mod known_hosts;
mod migrations;

pub use database::Database;
pub use error::StorageError;
pub use known_hosts::{KnownHost, KnownHosts};

pub type Result<T> = std::result::Result<T, StorageError>;
