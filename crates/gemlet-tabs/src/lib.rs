//! gemlet Tabs
//!
//! A [`TabSet`] is an ordered list of sessions, one of them active. Each
//! [`Session`] owns a history of the documents visited in it. There is
//! always at least one session.

mod error;
mod manager;
mod session;

pub use error::TabError;
pub use manager::TabSet;
pub use session::Session;

pub type Result<T> = std::result::Result<T, TabError>;
