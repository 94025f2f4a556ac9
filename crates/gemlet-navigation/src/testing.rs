//! In-memory Gemini server for tests
//!
//! [`ScriptedConnector`] answers each request line with a canned response,
//! optionally split into small reads, and records what the engine did so
//! tests can assert on it. Clones share the same script.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use gemlet_transport::{Connection, Connector, ReadOutcome, Result, TransportError};
use parking_lot::Mutex;

const NOT_FOUND: &[u8] = b"51 Not found\r\n";

#[derive(Debug, Clone)]
enum Route {
    Reply { body: Vec<u8>, chunk: usize },
    FailRead,
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<String, Route>,
    refused: HashSet<String>,
    fingerprints: HashMap<String, String>,
    requests: Vec<String>,
    connects: Vec<(String, u16)>,
    closes: usize,
    served: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `response`, delivered in one read.
    pub fn respond(&self, url: &str, response: impl Into<Vec<u8>>) {
        let body = response.into();
        let chunk = body.len().max(1);
        self.script
            .lock()
            .routes
            .insert(url.to_string(), Route::Reply { body, chunk });
    }

    /// Like [`respond`](Self::respond), but at most `chunk` bytes per read.
    pub fn respond_chunked(&self, url: &str, response: impl Into<Vec<u8>>, chunk: usize) {
        self.script.lock().routes.insert(
            url.to_string(),
            Route::Reply {
                body: response.into(),
                chunk: chunk.max(1),
            },
        );
    }

    /// Fail every read on connections that requested `url`.
    pub fn fail_reads(&self, url: &str) {
        self.script
            .lock()
            .routes
            .insert(url.to_string(), Route::FailRead);
    }

    /// Refuse connections to `host`.
    pub fn refuse(&self, host: &str) {
        self.script.lock().refused.insert(host.to_string());
    }

    /// Certificate fingerprint presented by `host` from the next
    /// connection on. Hosts without one present none.
    pub fn set_fingerprint(&self, host: &str, fingerprint: &str) {
        self.script
            .lock()
            .fingerprints
            .insert(host.to_string(), fingerprint.to_string());
    }

    /// Request lines received, in order, including the trailing CRLF.
    pub fn requests(&self) -> Vec<String> {
        self.script.lock().requests.clone()
    }

    pub fn connects(&self) -> Vec<(String, u16)> {
        self.script.lock().connects.clone()
    }

    /// Response bytes handed out across all connections.
    pub fn bytes_served(&self) -> usize {
        self.script.lock().served
    }

    /// Connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        let script = self.script.lock();
        script.connects.len() - script.closes
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Connection>> {
        let mut script = self.script.lock();
        if script.refused.contains(host) {
            return Err(TransportError::Connect(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }
        script.connects.push((host.to_string(), port));

        Ok(Box::new(ScriptedConnection {
            script: Arc::clone(&self.script),
            fingerprint: script.fingerprints.get(host).cloned(),
            request: Vec::new(),
            route: None,
            sent: 0,
            stalled: false,
            closed: false,
        }))
    }
}

struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
    fingerprint: Option<String>,
    request: Vec<u8>,
    route: Option<Route>,
    sent: usize,
    stalled: bool,
    closed: bool,
}

impl Connection for ScriptedConnection {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.request.extend_from_slice(data);

        if self.route.is_none() && self.request.ends_with(b"\r\n") {
            let line = String::from_utf8_lossy(&self.request).into_owned();
            let mut script = self.script.lock();
            let route = script
                .routes
                .get(line.trim_end())
                .cloned()
                .unwrap_or_else(|| Route::Reply {
                    body: NOT_FOUND.to_vec(),
                    chunk: NOT_FOUND.len(),
                });
            script.requests.push(line);
            self.route = Some(route);
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        // Every connection makes the reader wait once
        if !self.stalled {
            self.stalled = true;
            return Ok(ReadOutcome::WouldBlock);
        }

        match &self.route {
            None => Ok(ReadOutcome::Eof),
            Some(Route::FailRead) => Err(TransportError::TimedOut),
            Some(Route::Reply { body, chunk }) => {
                let remaining = &body[self.sent..];
                if remaining.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                let n = remaining.len().min(*chunk).min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                self.sent += n;
                self.script.lock().served += n;
                Ok(ReadOutcome::Data(n))
            }
        }
    }

    fn peer_fingerprint(&self) -> Option<String> {
        self.fingerprint.clone()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.script.lock().closes += 1;
        }
    }
}
