//! Gemtext tokens

use serde::Serialize;
use url::Url;

/// One structural line of a gemtext body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Token {
    /// `#`, `##` or `###` heading
    Header { level: u8, text: String },
    Text { text: String },
    /// `* item`
    List { text: String },
    /// `> quote`
    Quote { text: String },
    /// A line inside a ``` fence, kept verbatim
    Preformat { text: String, alt: String },
    /// `=> target [label]`, with the target already resolved against the
    /// document URL
    Link {
        url: Url,
        raw: String,
        label: Option<String>,
    },
}

impl Token {
    /// Text a renderer would show for this token. Links fall back to the
    /// raw target when they carry no label.
    pub fn display_text(&self) -> &str {
        match self {
            Token::Header { text, .. }
            | Token::Text { text }
            | Token::List { text }
            | Token::Quote { text }
            | Token::Preformat { text, .. } => text,
            Token::Link { raw, label, .. } => label.as_deref().unwrap_or(raw),
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Token::Link { .. })
    }
}
