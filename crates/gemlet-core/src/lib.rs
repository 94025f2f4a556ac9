//! gemlet Core
//!
//! The [`Browser`] value owns every piece of browsing state: configuration,
//! database, the navigation engine and the open tabs. A front end drives it
//! through its methods and hears back through a [`UiSink`].

mod browser;
mod config;
mod error;
mod ui;

pub use browser::{Browser, FollowStatus, Pending};
pub use config::{CertPolicy, Config};
pub use error::CoreError;
pub use ui::{RecordingSink, Severity, UiSink};

// Re-export the pieces a front end needs to inspect documents and tabs
pub use gemlet_document::{Document, LinkRef, StatusClass, Token};
pub use gemlet_navigation::{NavigationError, Target};
pub use gemlet_storage::{Database, StorageError};
pub use gemlet_tabs::{Session, TabError, TabSet};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
