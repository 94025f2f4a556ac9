//! The request state machine

use gemlet_document::{Document, LineBuffer, ResponseParser, StatusClass};
use gemlet_transport::{
    ConnectionGuard, Connector, ReadOutcome, TrustDecision, TrustStore, DEFAULT_PORT,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::NavigationError;
use crate::Result;

/// Longest request URL a Gemini server has to accept, in bytes.
pub const MAX_REQUEST_LEN: usize = 1024;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPolicy {
    pub auto_follow: bool,
    pub max_redirects: u8,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            auto_follow: true,
            max_redirects: 5,
        }
    }
}

/// How a navigation ended.
#[derive(Debug)]
pub enum NavOutcome {
    /// A page to commit to history. Failure statuses (4x, 5x, 6x) arrive
    /// here too so their meta can be shown.
    Document(Document),
    /// The server wants a line of input, to be sent back as the query of
    /// `url`.
    Input {
        url: Url,
        prompt: String,
        sensitive: bool,
    },
    /// A redirect that needs the user's go-ahead: automatic following is
    /// off, the redirect budget is spent, or it leaves Gemini.
    Redirect { from: Url, to: Url },
}

pub struct NavigationEngine {
    connector: Box<dyn Connector>,
    trust: Box<dyn TrustStore>,
    policy: RedirectPolicy,
}

impl NavigationEngine {
    pub fn new(connector: Box<dyn Connector>, trust: Box<dyn TrustStore>) -> Self {
        Self {
            connector,
            trust,
            policy: RedirectPolicy::default(),
        }
    }

    pub fn with_redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn redirect_policy(&self) -> RedirectPolicy {
        self.policy
    }

    pub fn set_redirect_policy(&mut self, policy: RedirectPolicy) {
        self.policy = policy;
    }

    /// Fetch `target`, following redirects within the policy's budget.
    pub fn follow(&self, target: Url) -> Result<NavOutcome> {
        let mut url = target;
        let mut redirects = 0u8;

        loop {
            let doc = self.fetch(&url)?;

            match doc.status_class() {
                StatusClass::Input => {
                    return Ok(NavOutcome::Input {
                        sensitive: doc.is_sensitive_input(),
                        prompt: doc.meta().to_string(),
                        url,
                    });
                }
                StatusClass::Redirect => {
                    let to = url.join(doc.meta().trim()).map_err(|_| {
                        NavigationError::MalformedRedirect {
                            from: url.to_string(),
                            target: doc.meta().to_string(),
                        }
                    })?;

                    let within_budget = redirects < self.policy.max_redirects;
                    if !self.policy.auto_follow || !within_budget || to.scheme() != "gemini" {
                        tracing::info!(from = %url, to = %to, redirects, "Redirect needs confirmation");
                        return Ok(NavOutcome::Redirect { from: url, to });
                    }

                    redirects += 1;
                    tracing::debug!(from = %url, to = %to, redirects, "Following redirect");
                    url = to;
                }
                _ => return Ok(NavOutcome::Document(doc)),
            }
        }
    }

    /// One request/response exchange.
    fn fetch(&self, url: &Url) -> Result<Document> {
        if url.scheme() != "gemini" {
            return Err(NavigationError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.as_str().len() > MAX_REQUEST_LEN {
            return Err(NavigationError::InvalidUrl(url.to_string()));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| NavigationError::InvalidUrl(url.to_string()))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        tracing::info!(url = %url, "Requesting");

        let conn = self
            .connector
            .connect(host, port)
            .map_err(|e| NavigationError::Connection(e.to_string()))?;
        let mut conn = ConnectionGuard::new(conn);

        if let Some(presented) = conn.peer_fingerprint() {
            self.verify(host, port, presented)?;
        }

        conn.send(format!("{url}\r\n").as_bytes())
            .map_err(|e| NavigationError::Connection(e.to_string()))?;

        let mut parser = ResponseParser::new(url.clone());
        let mut lines = LineBuffer::new();
        let mut buf = [0u8; READ_CHUNK];

        loop {
            match conn
                .recv(&mut buf)
                .map_err(|e| NavigationError::Read(e.to_string()))?
            {
                ReadOutcome::Data(n) => {
                    lines.push(&buf[..n]);
                    parser.drain(&mut lines)?;
                }
                ReadOutcome::WouldBlock => continue,
                ReadOutcome::Eof => break,
            }
        }

        if let Some(line) = lines.finish() {
            parser.feed(&line)?;
        }

        let doc = parser.finish()?;
        tracing::info!(url = %url, status = doc.status(), "Response received");
        Ok(doc)
    }

    fn verify(&self, host: &str, port: u16, presented: String) -> Result<()> {
        let decision = self
            .trust
            .check(host, port, &presented)
            .map_err(|e| NavigationError::Connection(e.to_string()))?;

        match decision {
            TrustDecision::Trusted => Ok(()),
            TrustDecision::FirstUse => {
                tracing::info!(host, port, fingerprint = %presented, "Pinned new certificate");
                Ok(())
            }
            TrustDecision::Mismatch { pinned } => {
                tracing::warn!(host, port, %pinned, %presented, "Certificate changed");
                Err(NavigationError::UntrustedCertificate {
                    host: host.to_string(),
                    port,
                    pinned,
                    presented,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use gemlet_document::{ParseError, Token, HEADER_CAPACITY};
    use gemlet_transport::{AcceptAnyTrust, MemoryTrustStore};

    fn engine(connector: &ScriptedConnector) -> NavigationEngine {
        NavigationEngine::new(Box::new(connector.clone()), Box::new(AcceptAnyTrust))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn document(outcome: NavOutcome) -> Document {
        match outcome {
            NavOutcome::Document(doc) => doc,
            other => panic!("expected a document, got {other:?}"),
        }
    }

    #[test]
    fn test_success_returns_document() {
        let server = ScriptedConnector::new();
        server.respond(
            "gemini://example.org/",
            "20 text/gemini\r\n# Welcome\r\n=> /next Next\r\n",
        );

        let doc = document(engine(&server).follow(url("gemini://example.org/")).unwrap());

        assert_eq!(doc.status(), 20);
        assert_eq!(doc.title(), "Welcome");
        assert_eq!(doc.link(1).unwrap().url.as_str(), "gemini://example.org/next");
        assert_eq!(server.requests(), vec!["gemini://example.org/\r\n"]);
        assert_eq!(server.open_connections(), 0);
    }

    #[test]
    fn test_response_split_into_tiny_reads() {
        let server = ScriptedConnector::new();
        server.respond_chunked(
            "gemini://example.org/",
            "20 text/gemini\r\n\r\n# Grüße\r\n```\r\n#raw\r\n```\r\nlast line",
            3,
        );

        let doc = document(engine(&server).follow(url("gemini://example.org/")).unwrap());

        assert_eq!(
            doc.tokens(),
            &[
                Token::Header {
                    level: 1,
                    text: "Grüße".to_string()
                },
                Token::Preformat {
                    text: "#raw".to_string(),
                    alt: String::new()
                },
                Token::Text {
                    text: "last line".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_custom_port_is_used() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org:1966/", "20 text/gemini\r\nhi\r\n");

        engine(&server)
            .follow(url("gemini://example.org:1966/"))
            .unwrap();

        assert_eq!(server.connects(), vec![("example.org".to_string(), 1966)]);
    }

    #[test]
    fn test_input_prompt() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/search", "10 Search terms\r\n");
        server.respond("gemini://example.org/login", "11 Password\r\n");

        let engine = engine(&server);
        match engine.follow(url("gemini://example.org/search")).unwrap() {
            NavOutcome::Input {
                url,
                prompt,
                sensitive,
            } => {
                assert_eq!(url.as_str(), "gemini://example.org/search");
                assert_eq!(prompt, "Search terms");
                assert!(!sensitive);
            }
            other => panic!("expected input, got {other:?}"),
        }

        assert!(matches!(
            engine.follow(url("gemini://example.org/login")).unwrap(),
            NavOutcome::Input {
                sensitive: true,
                ..
            }
        ));
    }

    #[test]
    fn test_redirects_are_followed() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/old", "31 /new\r\n");
        server.respond("gemini://example.org/new", "20 text/gemini\r\n# New\r\n");

        let doc = document(engine(&server).follow(url("gemini://example.org/old")).unwrap());

        assert_eq!(doc.url().as_str(), "gemini://example.org/new");
        assert_eq!(server.requests().len(), 2);
    }

    #[test]
    fn test_self_redirect_stops_at_budget() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/loop", "30 gemini://example.org/loop\r\n");

        let outcome = engine(&server)
            .follow(url("gemini://example.org/loop"))
            .unwrap();

        match outcome {
            NavOutcome::Redirect { from, to } => {
                assert_eq!(from, to);
                assert_eq!(to.as_str(), "gemini://example.org/loop");
            }
            other => panic!("expected a redirect, got {other:?}"),
        }
        // The original request plus five followed redirects
        assert_eq!(server.requests().len(), 6);
        assert_eq!(server.open_connections(), 0);
    }

    #[test]
    fn test_manual_redirects() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/old", "31 /new\r\n");

        let engine = engine(&server).with_redirect_policy(RedirectPolicy {
            auto_follow: false,
            max_redirects: 5,
        });
        let outcome = engine.follow(url("gemini://example.org/old")).unwrap();

        assert!(matches!(
            outcome,
            NavOutcome::Redirect { ref to, .. } if to.as_str() == "gemini://example.org/new"
        ));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_cross_scheme_redirect_needs_confirmation() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/web", "30 https://example.org/\r\n");

        let outcome = engine(&server)
            .follow(url("gemini://example.org/web"))
            .unwrap();

        assert!(matches!(
            outcome,
            NavOutcome::Redirect { ref to, .. } if to.scheme() == "https"
        ));
    }

    #[test]
    fn test_malformed_redirect() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/bad", "30 gemini://[broken\r\n");

        let err = engine(&server)
            .follow(url("gemini://example.org/bad"))
            .unwrap_err();

        assert!(matches!(err, NavigationError::MalformedRedirect { .. }));
    }

    #[test]
    fn test_failures_are_documents() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/gone", "51 Not found\r\n");
        server.respond("gemini://example.org/slow", "44 Slow down\r\n");
        server.respond("gemini://example.org/cert", "60 Certificate required\r\n");

        let engine = engine(&server);
        for (path, status) in [("gone", 51), ("slow", 44), ("cert", 60)] {
            let doc = document(
                engine
                    .follow(url(&format!("gemini://example.org/{path}")))
                    .unwrap(),
            );
            assert_eq!(doc.status(), status);
            assert!(doc.status_class().is_failure());
        }
    }

    #[test]
    fn test_unsupported_scheme_makes_no_request() {
        let server = ScriptedConnector::new();
        let err = engine(&server)
            .follow(url("https://example.org/"))
            .unwrap_err();

        assert!(matches!(err, NavigationError::UnsupportedScheme(ref s) if s == "https"));
        assert!(server.connects().is_empty());
    }

    #[test]
    fn test_overlong_url_is_rejected() {
        let server = ScriptedConnector::new();
        let long = format!("gemini://example.org/{}", "a".repeat(MAX_REQUEST_LEN));

        let err = engine(&server).follow(url(&long)).unwrap_err();

        assert!(matches!(err, NavigationError::InvalidUrl(_)));
        assert!(server.connects().is_empty());
    }

    #[test]
    fn test_connection_refused() {
        let server = ScriptedConnector::new();
        server.refuse("down.example");

        let err = engine(&server)
            .follow(url("gemini://down.example/"))
            .unwrap_err();

        assert!(matches!(err, NavigationError::Connection(_)));
    }

    #[test]
    fn test_read_failure() {
        let server = ScriptedConnector::new();
        server.fail_reads("gemini://example.org/");

        let err = engine(&server)
            .follow(url("gemini://example.org/"))
            .unwrap_err();

        assert!(matches!(err, NavigationError::Read(_)));
        assert_eq!(server.open_connections(), 0);
    }

    #[test]
    fn test_parse_error_closes_connection() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/", "HTTP/1.1 200 OK\r\n\r\n");

        let err = engine(&server)
            .follow(url("gemini://example.org/"))
            .unwrap_err();

        assert!(matches!(err, NavigationError::Parse(_)));
        assert_eq!(server.open_connections(), 0);
    }

    #[test]
    fn test_endless_status_line_is_cut_off() {
        let server = ScriptedConnector::new();
        let mut response = b"20 ".to_vec();
        response.extend(std::iter::repeat(b'x').take(5_000_000));
        response.extend_from_slice(b"\r\n# Hi\r\n");
        server.respond_chunked("gemini://example.org/", response, READ_CHUNK);

        let err = engine(&server)
            .follow(url("gemini://example.org/"))
            .unwrap_err();

        assert!(matches!(
            err,
            NavigationError::Parse(ParseError::HeaderTooLong { .. })
        ));
        // Gave up within the first read past the limit
        assert!(server.bytes_served() <= HEADER_CAPACITY + READ_CHUNK);
        assert_eq!(server.open_connections(), 0);
    }

    #[test]
    fn test_empty_response_is_a_parse_error() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/", "");

        let err = engine(&server)
            .follow(url("gemini://example.org/"))
            .unwrap_err();

        assert!(matches!(err, NavigationError::Parse(_)));
    }

    #[test]
    fn test_changed_certificate_is_refused() {
        let server = ScriptedConnector::new();
        server.respond("gemini://example.org/", "20 text/gemini\r\nhi\r\n");
        server.set_fingerprint("example.org", "aaaa");

        let engine = NavigationEngine::new(
            Box::new(server.clone()),
            Box::new(MemoryTrustStore::new()),
        );

        engine.follow(url("gemini://example.org/")).unwrap();
        engine.follow(url("gemini://example.org/")).unwrap();

        server.set_fingerprint("example.org", "bbbb");
        let err = engine.follow(url("gemini://example.org/")).unwrap_err();

        match err {
            NavigationError::UntrustedCertificate {
                host,
                port,
                pinned,
                presented,
            } => {
                assert_eq!(host, "example.org");
                assert_eq!(port, 1965);
                assert_eq!(pinned, "aaaa");
                assert_eq!(presented, "bbbb");
            }
            other => panic!("expected a trust failure, got {other:?}"),
        }
        // Refused before the request line went out
        assert_eq!(server.requests().len(), 2);
        assert_eq!(server.open_connections(), 0);
    }
}
