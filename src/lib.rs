//! Reports how many whole days remain before a host's TLS certificate expires.
//!
//! The pipeline is strictly sequential: [`connector::connect`] fetches the
//! peer chain over one TLS handshake, then [`validator::validate`] verifies
//! the leaf against the rest of the chain and builds a [`CertificateReport`].
//!
//! ```no_run
//! use tlsdays::{check, ConnectOptions, ConnectionTarget};
//!
//! let target = ConnectionTarget::parse("https://example.com", None, 443)?;
//! let report = check(&target, &ConnectOptions::default(), chrono::Utc::now())?;
//! println!("{}", report.days_remaining);
//! # Ok::<(), tlsdays::Error>(())
//! ```

use chrono::{DateTime, Utc};
use log::info;

pub mod chain;
pub mod config;
pub mod connector;
pub mod error;
pub mod logger;
pub mod report;
pub mod target;
pub mod validator;

pub use chain::{CertificateChain, TrustAnchorSet};
pub use connector::{connect, ConnectOptions};
pub use error::{
    ConnectFailure, ConnectionError, Error, InputError, ValidationError, ValidationFailure,
};
pub use report::{CertificateReport, OutputFormat};
pub use target::ConnectionTarget;
pub use validator::{truncate_to_days, validate};

/// Connects to `target` and validates its chain at `now`.
pub fn check(
    target: &ConnectionTarget,
    options: &ConnectOptions,
    now: DateTime<Utc>,
) -> Result<CertificateReport, Error> {
    let chain = connect(target, options)?;
    let report = validate(&chain, now)?;
    info!(
        "{} expires at {} ({} days)",
        target, report.not_after, report.days_remaining
    );
    Ok(report)
}
