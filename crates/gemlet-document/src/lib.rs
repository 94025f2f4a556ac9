//! gemlet Documents
//!
//! A Gemini response is a status line followed, for successful requests, by
//! a body. [`ResponseParser`] consumes it one complete line at a time and
//! produces an immutable [`Document`]: status, meta, the gemtext [`Token`]
//! stream, the raw source lines and a short display title.
//!
//! Lines rarely line up with network reads, so [`LineBuffer`] re-assembles
//! them before they reach the parser.

mod document;
mod error;
mod lines;
mod parser;
mod status;
mod token;

pub use document::{Document, LinkRef, HEADER_CAPACITY, META_CAPACITY, TITLE_CAPACITY};
pub use error::ParseError;
pub use lines::LineBuffer;
pub use parser::ResponseParser;
pub use status::StatusClass;
pub use token::Token;

pub type Result<T> = std::result::Result<T, ParseError>;
