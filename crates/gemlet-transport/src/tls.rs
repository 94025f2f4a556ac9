//! rustls-backed [`Connector`].
//!
//! Geminispace is overwhelmingly self-signed, so chain validation against a
//! CA bundle would reject most capsules. The verifier installed here accepts
//! any chain (handshake signatures are still checked with the ring
//! provider) and leaves the trust decision to a [`crate::TrustStore`],
//! which the caller consults with [`Connection::peer_fingerprint`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme, StreamOwned};
use sha2::{Digest, Sha256};

use crate::connection::{Connection, Connector, ReadOutcome};
use crate::error::TransportError;
use crate::Result;

/// TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// SHA-256 of a DER certificate as lowercase hex.
pub fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Shared, reusable TLS client configuration.
pub struct TlsConnector {
    config: Arc<ClientConfig>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl TlsConnector {
    pub fn new() -> Result<Self> {
        Self::with_timeouts(Some(DEFAULT_CONNECT_TIMEOUT), Some(DEFAULT_READ_TIMEOUT))
    }

    /// `None` disables the corresponding timeout; a read may then block
    /// for as long as the server keeps the connection open.
    pub fn with_timeouts(
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = AnyCertVerifier {
            provider: Arc::clone(&provider),
        };

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
            connect_timeout,
            read_timeout,
        })
    }

    /// Try every resolved address in order; the first that accepts wins.
    fn tcp_connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                host: host.to_string(),
                source,
            })?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    tracing::debug!(%addr, "TCP connected");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "TCP connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => TransportError::Connect(e),
            None => TransportError::NoAddress(format!("{host}:{port}")),
        })
    }
}

impl Connector for TlsConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Connection>> {
        // IPv6 literals arrive bracketed from URL host strings
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let mut tcp = self.tcp_connect(host, port)?;
        tcp.set_read_timeout(self.read_timeout)
            .map_err(TransportError::Connect)?;

        let sni = ServerName::try_from(host.to_owned())
            .map_err(|e| TransportError::InvalidServerName(format!("{host}: {e}")))?;
        let mut tls = ClientConnection::new(Arc::clone(&self.config), sni)?;

        while tls.is_handshaking() {
            tls.complete_io(&mut tcp)
                .map_err(TransportError::Handshake)?;
        }

        let fingerprint = tls
            .peer_certificates()
            .and_then(|chain| chain.first())
            .map(|leaf| fingerprint(leaf.as_ref()));

        tracing::debug!(host = %host, port, "TLS handshake complete");

        Ok(Box::new(TlsConnection {
            stream: StreamOwned::new(tls, tcp),
            fingerprint,
            closed: false,
        }))
    }
}

struct TlsConnection {
    stream: StreamOwned<ClientConnection, TcpStream>,
    fingerprint: Option<String>,
    closed: bool,
}

impl Connection for TlsConnection {
    fn send(&mut self, mut data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        while !data.is_empty() {
            match self.stream.write(data) {
                Ok(0) => {
                    return Err(TransportError::Write(io::Error::from(
                        io::ErrorKind::WriteZero,
                    )))
                }
                Ok(n) => data = &data[n..],
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(TransportError::Write(e)),
            }
        }

        self.stream.flush().map_err(TransportError::Write)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if self.closed {
            return Ok(ReadOutcome::Eof);
        }

        match self.stream.read(buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(ReadOutcome::WouldBlock),
            // The socket is blocking, so these only surface once the read
            // timeout has expired
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Err(TransportError::TimedOut)
            }
            // Most servers close without close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(ReadOutcome::Eof),
            Err(e) => Err(TransportError::Read(e)),
        }
    }

    fn peer_fingerprint(&self) -> Option<String> {
        self.fingerprint.clone()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.stream.conn.send_close_notify();
        while self.stream.conn.wants_write() {
            if self.stream.conn.write_tls(&mut self.stream.sock).is_err() {
                break;
            }
        }
        let _ = self.stream.sock.shutdown(Shutdown::Both);
    }
}

impl Drop for TlsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug)]
struct AnyCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::pki_types::PrivatePkcs8KeyDer;
    use rustls::{ServerConfig, ServerConnection};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Spawn a local TLS server with a fresh self-signed certificate that
    /// accepts one connection, reads the request line and replies with
    /// `response`. Returns the request it saw, the port and the
    /// certificate fingerprint.
    fn spawn_gemini_server(response: &'static [u8]) -> (JoinHandle<String>, u16, String) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_der = cert.cert.der().clone();
        let expected = fingerprint(cert_der.as_ref());
        let key = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let config = ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key.into())
        .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = std::thread::spawn(move || {
            let (tcp, _) = listener.accept().unwrap();
            let conn = ServerConnection::new(Arc::new(config)).unwrap();
            let mut tls = StreamOwned::new(conn, tcp);

            let mut request = Vec::new();
            let mut byte = [0u8; 1];
            while !request.ends_with(b"\r\n") {
                tls.read_exact(&mut byte).unwrap();
                request.push(byte[0]);
            }

            tls.write_all(response).unwrap();
            tls.conn.send_close_notify();
            tls.flush().unwrap();

            String::from_utf8(request).unwrap()
        });

        (handle, port, expected)
    }

    fn read_to_end(conn: &mut dyn Connection) -> Vec<u8> {
        let mut body = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match conn.recv(&mut buf).unwrap() {
                ReadOutcome::Data(n) => body.extend_from_slice(&buf[..n]),
                ReadOutcome::WouldBlock => continue,
                ReadOutcome::Eof => break,
            }
        }
        body
    }

    #[test]
    fn test_fingerprint_is_lowercase_hex_sha256() {
        let fp = fingerprint(b"");
        assert_eq!(
            fp,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_round_trip_against_self_signed_server() {
        let (handle, port, expected) = spawn_gemini_server(b"20 text/gemini\r\n# Hello\n");

        let connector = TlsConnector::new().unwrap();
        let mut conn = connector.connect("127.0.0.1", port).unwrap();
        assert_eq!(conn.peer_fingerprint().as_deref(), Some(expected.as_str()));

        conn.send(b"gemini://127.0.0.1/\r\n").unwrap();
        let body = read_to_end(&mut *conn);
        assert_eq!(body, b"20 text/gemini\r\n# Hello\n");

        conn.close();
        conn.close();
        assert!(matches!(
            conn.send(b"again\r\n"),
            Err(TransportError::Closed)
        ));

        assert_eq!(handle.join().unwrap(), "gemini://127.0.0.1/\r\n");
    }

    #[test]
    fn test_refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = TlsConnector::new().unwrap();
        let result = connector.connect("127.0.0.1", port);
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
