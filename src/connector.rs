//! Fetching the peer certificate chain over a TLS handshake.

use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};
use openssl::ssl::{HandshakeError, Ssl, SslContext, SslMethod, SslVerifyMode};

use crate::chain::CertificateChain;
use crate::error::{ConnectFailure, ConnectionError};
use crate::target::ConnectionTarget;

/// Default connect and read/write timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Transport settings for a single connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

/// Opens one TLS session to `target` and returns the chain the server presented.
///
/// The handshake accepts any peer so that chains the local trust store would
/// reject still reach the validator. The socket is closed before returning.
pub fn connect(
    target: &ConnectionTarget,
    options: &ConnectOptions,
) -> Result<CertificateChain, ConnectionError> {
    fetch_chain(target, options)
        .map_err(|cause| ConnectionError::new(target.hostname(), target.port(), cause))
}

fn fetch_chain(
    target: &ConnectionTarget,
    options: &ConnectOptions,
) -> Result<CertificateChain, ConnectFailure> {
    let mut context = SslContext::builder(SslMethod::tls())?;
    context.set_verify(SslVerifyMode::NONE);
    let context = context.build();

    let mut ssl = Ssl::new(&context)?;
    // SNI must not carry IP literals.
    if target.hostname().parse::<IpAddr>().is_err() {
        ssl.set_hostname(target.hostname())?;
    }

    let addresses = resolve(target)?;
    let tcp_stream = open_first(&addresses, options.timeout)?;

    debug!("starting TLS handshake with {}", target);
    let mut stream = ssl
        .connect(tcp_stream)
        .map_err(|e| handshake_failure(e, options.timeout))?;
    info!(
        "connected to {} using {}",
        target,
        stream.ssl().version_str()
    );

    let certs = stream
        .ssl()
        .peer_cert_chain()
        .map(|stack| stack.iter().map(|c| c.to_owned()).collect::<Vec<_>>())
        .unwrap_or_default();
    debug!("server presented {} certificate(s)", certs.len());

    if let Err(e) = stream.shutdown() {
        debug!("TLS shutdown with {} did not complete: {}", target, e);
    }

    CertificateChain::new(certs).ok_or(ConnectFailure::NoPeerCertificates)
}

fn resolve(target: &ConnectionTarget) -> Result<Vec<SocketAddr>, ConnectFailure> {
    debug!("resolving {}", target);
    let addresses: Vec<SocketAddr> = (target.hostname(), target.port())
        .to_socket_addrs()
        .map_err(|source| ConnectFailure::DnsResolution { source })?
        .collect();

    if addresses.is_empty() {
        return Err(ConnectFailure::DnsResolution {
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        });
    }
    debug!("{} resolved to {:?}", target.hostname(), addresses);
    Ok(addresses)
}

/// Connects to each address in resolver order and keeps the first success.
///
/// When every attempt fails the error of the last one is returned.
fn open_first(addresses: &[SocketAddr], timeout: Duration) -> Result<TcpStream, ConnectFailure> {
    let mut last_error = None;
    for addr in addresses {
        match open_tcp(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("connection to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| ConnectFailure::DnsResolution {
        source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
    }))
}

fn open_tcp(addr: &SocketAddr, timeout: Duration) -> Result<TcpStream, ConnectFailure> {
    let stream = TcpStream::connect_timeout(addr, timeout).map_err(|source| {
        if source.kind() == io::ErrorKind::TimedOut {
            warn!("connection to {} timed out", addr);
            ConnectFailure::Timeout {
                secs: timeout.as_secs(),
            }
        } else {
            ConnectFailure::Tcp { source }
        }
    })?;

    stream
        .set_read_timeout(Some(timeout))
        .map_err(|source| ConnectFailure::Tcp { source })?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(|source| ConnectFailure::Tcp { source })?;
    Ok(stream)
}

fn handshake_failure<S: std::fmt::Debug>(e: HandshakeError<S>, timeout: Duration) -> ConnectFailure {
    // A read timeout on a blocking socket surfaces as WouldBlock.
    let timed_out = match &e {
        HandshakeError::WouldBlock(_) => true,
        HandshakeError::Failure(mid) => mid.error().io_error().map_or(false, |io| {
            matches!(
                io.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            )
        }),
        HandshakeError::SetupFailure(_) => false,
    };

    if timed_out {
        warn!("TLS handshake timed out");
        ConnectFailure::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        ConnectFailure::Handshake {
            details: e.to_string(),
        }
    }
}
