//! Incremental Gemini response parser
//!
//! Fed one complete line at a time (see [`crate::LineBuffer`]). The first
//! line is the status line; the rest is the body, tokenized as gemtext when
//! the response is `text/gemini`.

use url::Url;

use crate::document::{Document, HEADER_CAPACITY, META_CAPACITY, TITLE_CAPACITY};
use crate::error::ParseError;
use crate::lines::LineBuffer;
use crate::status::StatusClass;
use crate::token::Token;
use crate::Result;

const FENCE: &str = "```";

/// Longest preformat alt tag kept, in bytes.
const ALT_CAPACITY: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    /// `text/gemini`: full markup recognition
    Gemtext,
    /// Other `text/*`: one Text token per line
    Plain,
    /// Anything else: raw lines only
    Opaque,
}

#[derive(Debug)]
struct StatusLine {
    status: u8,
    class: StatusClass,
    meta: String,
}

pub struct ResponseParser {
    url: Url,
    line_number: u64,
    header: Option<StatusLine>,
    mode: BodyMode,
    preformat_on: bool,
    preformat_alt: String,
    tokens: Vec<Token>,
    raw_lines: Vec<String>,
}

impl ResponseParser {
    /// Start parsing the response to a request for `url`. Relative links
    /// in the body resolve against it.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            line_number: 0,
            header: None,
            mode: BodyMode::Gemtext,
            preformat_on: false,
            preformat_alt: String::new(),
            tokens: Vec::new(),
            raw_lines: Vec::new(),
        }
    }

    /// Parse a complete response held in memory.
    pub fn parse_bytes(url: Url, bytes: &[u8]) -> Result<Document> {
        let mut parser = Self::new(url);
        let mut lines = LineBuffer::new();
        lines.push(bytes);
        parser.drain(&mut lines)?;
        if let Some(line) = lines.finish() {
            parser.feed(&line)?;
        }
        parser.finish()
    }

    /// Feed every complete line waiting in `lines`.
    ///
    /// Until the status line is in, a line (or an unterminated tail) longer
    /// than [`HEADER_CAPACITY`] is rejected, so a server cannot make the
    /// buffer grow without bound before the body even starts.
    pub fn drain(&mut self, lines: &mut LineBuffer) -> Result<()> {
        while let Some(line) = lines.next_line() {
            if self.line_number == 0 {
                // +1 for the newline the buffer consumed
                check_header_len(line.len() + 1)?;
            }
            self.feed(&line)?;
        }
        if self.line_number == 0 {
            check_header_len(lines.pending())?;
        }
        Ok(())
    }

    /// Consume one line (without its `\n`).
    pub fn feed(&mut self, line: &str) -> Result<()> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        self.line_number += 1;
        self.raw_lines.push(line.to_string());

        if self.line_number == 1 {
            return self.parse_status(line);
        }

        // The blank separator some servers send after the status line
        if self.line_number == 2 && line.is_empty() {
            return Ok(());
        }

        match self.mode {
            BodyMode::Gemtext => self.parse_gemtext(line),
            BodyMode::Plain => self.tokens.push(Token::Text {
                text: line.to_string(),
            }),
            BodyMode::Opaque => {}
        }

        Ok(())
    }

    /// Seal the document and derive its title.
    pub fn finish(self) -> Result<Document> {
        let header = self.header.ok_or(ParseError::MissingHeader)?;
        let title = extract_title(&self.url, &self.tokens);

        tracing::debug!(
            url = %self.url,
            status = header.status,
            tokens = self.tokens.len(),
            "Parsed response"
        );

        Ok(Document {
            url: self.url,
            status: header.status,
            class: header.class,
            meta: header.meta,
            tokens: self.tokens,
            raw_lines: self.raw_lines,
            title,
        })
    }

    fn parse_status(&mut self, line: &str) -> Result<()> {
        let mut chars = line.chars();
        let digits = (
            chars.next().and_then(|c| c.to_digit(10)),
            chars.next().and_then(|c| c.to_digit(10)),
        );
        let (first, second) = match digits {
            (Some(first), Some(second)) => (first as u8, second as u8),
            _ => return Err(ParseError::MalformedStatus(line.to_string())),
        };

        let class = StatusClass::from_digit(first).ok_or(ParseError::UnknownStatusClass(first))?;

        let meta: String = line.chars().skip(3).collect();
        let meta = truncate_on_boundary(&meta, META_CAPACITY).to_string();

        if class == StatusClass::Success {
            self.mode = body_mode(&meta);
        }

        self.header = Some(StatusLine {
            status: first * 10 + second,
            class,
            meta,
        });
        Ok(())
    }

    fn parse_gemtext(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix(FENCE) {
            self.preformat_on = !self.preformat_on;
            self.preformat_alt.clear();
            if self.preformat_on {
                self.preformat_alt
                    .push_str(truncate_on_boundary(rest, ALT_CAPACITY));
            }
            return;
        }

        if self.preformat_on {
            self.tokens.push(Token::Preformat {
                text: line.to_string(),
                alt: self.preformat_alt.clone(),
            });
            return;
        }

        let token = if let Some(rest) = line.strip_prefix("###") {
            header(3, rest)
        } else if let Some(rest) = line.strip_prefix("##") {
            header(2, rest)
        } else if let Some(rest) = line.strip_prefix('#') {
            header(1, rest)
        } else if let Some(rest) = line.strip_prefix('>') {
            Token::Quote {
                text: skip_blanks(rest).to_string(),
            }
        } else if let Some(rest) = line.strip_prefix("=>") {
            self.parse_link(line, rest)
        } else if let Some(rest) = line.strip_prefix("* ") {
            Token::List {
                text: skip_blanks(rest).to_string(),
            }
        } else {
            Token::Text {
                text: skip_blanks(line).to_string(),
            }
        };

        self.tokens.push(token);
    }

    /// `=>[blanks]target[blanks][label]`
    fn parse_link(&self, line: &str, rest: &str) -> Token {
        let rest = skip_blanks(rest);
        let end = rest.find(is_blank).unwrap_or(rest.len());
        let (raw, remainder) = rest.split_at(end);
        let label = skip_blanks(remainder);

        let resolved = if raw.is_empty() {
            None
        } else {
            self.url.join(raw).ok()
        };

        match resolved {
            Some(url) => Token::Link {
                url,
                raw: raw.to_string(),
                label: (!label.is_empty()).then(|| label.to_string()),
            },
            None => {
                tracing::debug!(target_url = %raw, "Unresolvable link kept as text");
                Token::Text {
                    text: line.to_string(),
                }
            }
        }
    }
}

fn check_header_len(len: usize) -> Result<()> {
    if len > HEADER_CAPACITY {
        return Err(ParseError::HeaderTooLong {
            len,
            capacity: HEADER_CAPACITY,
        });
    }
    Ok(())
}

fn header(level: u8, rest: &str) -> Token {
    Token::Header {
        level,
        text: skip_blanks(rest).to_string(),
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn skip_blanks(s: &str) -> &str {
    s.trim_start_matches(is_blank)
}

fn body_mode(meta: &str) -> BodyMode {
    let mime = meta.trim().to_ascii_lowercase();
    if mime.is_empty() || mime.starts_with("text/gemini") {
        BodyMode::Gemtext
    } else if mime.starts_with("text/") {
        BodyMode::Plain
    } else {
        BodyMode::Opaque
    }
}

fn truncate_on_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// First level-1 heading, else first text line, else the host. An empty
/// heading still counts as the first heading.
fn extract_title(url: &Url, tokens: &[Token]) -> String {
    let heading = tokens.iter().find_map(|token| match token {
        Token::Header { level: 1, text } => Some(text.as_str()),
        _ => None,
    });
    let text = || {
        tokens.iter().find_map(|token| match token {
            Token::Text { text } => Some(text.as_str()),
            _ => None,
        })
    };

    let title = heading
        .or_else(text)
        .unwrap_or_else(|| url.host_str().unwrap_or_default());

    if title.chars().count() <= TITLE_CAPACITY {
        return title.to_string();
    }
    let mut short: String = title.chars().take(TITLE_CAPACITY - 3).collect();
    short.push_str("...");
    short
}
