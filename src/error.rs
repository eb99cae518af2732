//! Error types for certificate acquisition and validation.
//!
//! Every failure is terminal for a run. The three families mirror the stages
//! of the pipeline: bad input, failure to reach the host, and failure to
//! establish trust in the presented chain.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Top-level error returned by [`crate::check`] and the binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Report could not be serialized for output
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Invalid input provided by the caller. No network activity happens.
#[derive(Debug, Error)]
pub enum InputError {
    /// No hostname was supplied
    #[error("missing required hostname")]
    MissingHostname,

    /// The `https://` URL could not be parsed or has no host
    #[error("Error parsing hostname '{input}': {reason}")]
    InvalidUrl {
        /// The raw argument
        input: String,
        /// Why parsing failed
        reason: String,
    },

    /// The port is not a valid TCP port number
    #[error("invalid port '{input}': expected a number between 1 and 65535")]
    InvalidPort {
        /// The raw port argument
        input: String,
    },
}

/// Failure to obtain a certificate chain from `hostname:port`.
#[derive(Debug, Error)]
#[error("Error connecting to {hostname}:{port}: {cause}")]
pub struct ConnectionError {
    pub hostname: String,
    pub port: u16,
    #[source]
    pub cause: ConnectFailure,
}

impl ConnectionError {
    pub(crate) fn new(hostname: &str, port: u16, cause: ConnectFailure) -> Self {
        ConnectionError {
            hostname: hostname.to_string(),
            port,
            cause,
        }
    }
}

/// The stage at which the connection attempt failed.
#[derive(Debug, Error)]
pub enum ConnectFailure {
    /// DNS resolution failed or returned no addresses
    #[error("failed to resolve host address: {source}")]
    DnsResolution {
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connect was refused, reset or otherwise failed
    #[error("TCP connection failed: {source}")]
    Tcp {
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connect or the handshake did not complete within the timeout
    #[error("connection timed out after {secs}s")]
    Timeout {
        /// Configured timeout in seconds
        secs: u64,
    },

    /// TLS handshake failed
    #[error("TLS handshake failed: {details}")]
    Handshake {
        /// Details about why the handshake failed
        details: String,
    },

    /// The handshake completed but the peer presented no certificates
    #[error("server presented no certificates")]
    NoPeerCertificates,

    /// OpenSSL could not set up the client session
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

/// Failure to establish trust in the presented chain.
#[derive(Debug, Error)]
#[error("Error validating certificate chain: {cause}")]
pub struct ValidationError {
    #[source]
    pub cause: ValidationFailure,
}

/// Why chain verification failed.
#[derive(Debug, Error)]
pub enum ValidationFailure {
    /// Path validation rejected the chain
    #[error("{reason} (verify error {code} at depth {depth})")]
    Untrusted {
        /// OpenSSL verify result code
        code: i32,
        /// Human-readable verify result
        reason: String,
        /// Position in the path where validation failed, 0 is the leaf
        depth: u32,
    },

    /// Certificate data could not be read
    #[error("malformed certificate: {reason}")]
    MalformedCertificate {
        /// Which field could not be decoded
        reason: String,
    },

    /// OpenSSL failed while building the verification context
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

impl From<ValidationFailure> for ValidationError {
    fn from(cause: ValidationFailure) -> Self {
        ValidationError { cause }
    }
}

impl From<openssl::error::ErrorStack> for ValidationError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        ValidationFailure::OpenSsl(e).into()
    }
}
