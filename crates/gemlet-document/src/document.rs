//! The parsed result of one Gemini response

use serde::Serialize;
use url::Url;

use crate::status::StatusClass;
use crate::token::Token;

/// Longest meta string kept from a status line, in bytes.
pub const META_CAPACITY: usize = 1021;

/// Longest status line accepted from the network, CRLF included.
pub const HEADER_CAPACITY: usize = 1024 + 2;

/// Longest display title, in characters.
pub const TITLE_CAPACITY: usize = 15;

/// A fully parsed response. Built by [`crate::ResponseParser`] and immutable
/// afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub(crate) url: Url,
    pub(crate) status: u8,
    pub(crate) class: StatusClass,
    pub(crate) meta: String,
    pub(crate) tokens: Vec<Token>,
    pub(crate) raw_lines: Vec<String>,
    pub(crate) title: String,
}

/// A numbered view of one link token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRef<'a> {
    /// 1-based position among the document's links
    pub number: usize,
    pub url: &'a Url,
    pub raw: &'a str,
    pub label: Option<&'a str>,
}

impl Document {
    /// The URL this response was requested from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Two-digit status code, e.g. `20` or `51`.
    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn status_class(&self) -> StatusClass {
        self.class
    }

    pub fn meta(&self) -> &str {
        &self.meta
    }

    /// MIME type of a successful response. An empty meta means
    /// `text/gemini`.
    pub fn mime(&self) -> Option<&str> {
        if self.class != StatusClass::Success {
            return None;
        }
        let meta = self.meta.trim();
        Some(if meta.is_empty() { "text/gemini" } else { meta })
    }

    /// Status 11: the server asked for input that should not be echoed.
    pub fn is_sensitive_input(&self) -> bool {
        self.status == 11
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn raw_lines(&self) -> &[String] {
        &self.raw_lines
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn links(&self) -> impl Iterator<Item = LinkRef<'_>> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Link { url, raw, label } => Some((url, raw, label)),
                _ => None,
            })
            .enumerate()
            .map(|(index, (url, raw, label))| LinkRef {
                number: index + 1,
                url,
                raw,
                label: label.as_deref(),
            })
    }

    /// The `number`th link, counting from 1 in document order.
    pub fn link(&self, number: usize) -> Option<LinkRef<'_>> {
        if number == 0 {
            return None;
        }
        self.links().nth(number - 1)
    }

    pub fn link_count(&self) -> usize {
        self.tokens.iter().filter(|token| token.is_link()).count()
    }
}
