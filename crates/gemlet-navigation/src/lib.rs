//! gemlet Navigation
//!
//! Drives one request from URL to [`gemlet_document::Document`]:
//! - open the transport and apply the certificate trust policy
//! - send the request line, stream the reply through the parser
//! - act on the status class: prompt for input, follow redirects up to a
//!   bound, or hand back the document
//!
//! The resulting documents are kept per tab in a [`HistoryStack`].

mod engine;
mod error;
mod history;
mod input;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use engine::{NavOutcome, NavigationEngine, RedirectPolicy, MAX_REQUEST_LEN};
pub use error::NavigationError;
pub use history::HistoryStack;
pub use input::{with_query, Target};

pub type Result<T> = std::result::Result<T, NavigationError>;
