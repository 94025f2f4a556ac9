//! Tab error types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TabError {
    #[error("Cannot close the last tab")]
    LastSession,

    #[error("Tab not found: {0}")]
    NotFound(usize),
}
