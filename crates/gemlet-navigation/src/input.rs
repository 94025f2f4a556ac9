//! Resolving what the user typed into a navigation target

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::NavigationError;
use crate::Result;

/// Unreserved characters (RFC 3986) stay as they are; everything else in a
/// query answer is escaped.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// What a line of user input points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A link number on the current page, 1-based
    Link(usize),
    Url(Url),
}

impl Target {
    /// Resolve `input` against the page currently shown, if any.
    ///
    /// - `3` picks link number 3
    /// - `gemini://host/path` is taken as is
    /// - `host.tld/path` or `localhost` gets `gemini://` prepended
    /// - anything else is relative to `current`
    pub fn parse(input: &str, current: Option<&Url>) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(NavigationError::InvalidUrl(input.to_string()));
        }

        if input.bytes().all(|b| b.is_ascii_digit()) {
            return input
                .parse()
                .map(Target::Link)
                .map_err(|_| NavigationError::InvalidUrl(input.to_string()));
        }

        let invalid = |_: url::ParseError| NavigationError::InvalidUrl(input.to_string());

        if input.contains("://") {
            return Url::parse(input).map(Target::Url).map_err(invalid);
        }

        if looks_like_host(input) {
            return Url::parse(&format!("gemini://{input}"))
                .map(Target::Url)
                .map_err(invalid);
        }

        match current {
            Some(base) => base.join(input).map(Target::Url).map_err(invalid),
            None => Err(NavigationError::InvalidUrl(input.to_string())),
        }
    }
}

/// `url` with its query replaced by the escaped `text`.
pub fn with_query(url: &Url, text: &str) -> Url {
    let mut url = url.clone();
    let encoded = utf8_percent_encode(text, QUERY).to_string();
    url.set_query(Some(&encoded));
    url
}

fn looks_like_host(input: &str) -> bool {
    if input.starts_with(['/', '.', '?', '#']) {
        return false;
    }
    let host = input.split(['/', '?', '#']).next().unwrap_or(input);
    host.contains('.') || host == "localhost" || host.starts_with("localhost:")
}
