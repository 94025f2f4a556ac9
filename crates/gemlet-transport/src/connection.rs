//! Connection abstraction
//!
//! The engine talks to a boxed [`Connection`] produced by a [`Connector`],
//! mirroring how a TLS provider wraps a plain stream: the concrete transport
//! (rustls over TCP in production, a scripted stream in tests) stays behind
//! the trait.

use std::ops::{Deref, DerefMut};

use crate::Result;

/// Result of a single receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written into the caller's buffer.
    Data(usize),
    /// Nothing available yet; the caller should retry.
    WouldBlock,
    /// The peer closed the connection.
    Eof,
}

/// An established, encrypted connection to a Gemini server.
pub trait Connection {
    /// Write all of `data`, retrying while the transport makes no progress.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// SHA-256 fingerprint of the server's leaf certificate, lowercase hex.
    ///
    /// `None` when the transport has no certificate to offer.
    fn peer_fingerprint(&self) -> Option<String>;

    /// Release the connection. Calling this more than once is harmless.
    fn close(&mut self);
}

/// Opens connections to `host:port`.
pub trait Connector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Connection>>;
}

/// Closes the wrapped connection when dropped, so every exit path of a
/// request (including a parse failure halfway through the body) releases
/// the socket.
pub struct ConnectionGuard {
    conn: Box<dyn Connection>,
}

impl ConnectionGuard {
    pub fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        &*self.conn
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.conn
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.conn.close();
    }
}
