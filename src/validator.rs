//! Chain verification and expiration countdown.
//!
//! The leaf is verified against a store holding only the certificates that
//! followed it in the chain. Partial chains are accepted so an intermediate
//! anchor ends the path the same way a self-signed root would. Verification
//! runs at a caller-supplied instant so expiry boundaries are reproducible.

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::{X509VerifyFlags, X509VerifyParam};
use openssl::x509::{X509NameRef, X509Ref, X509StoreContext, X509VerifyResult, X509};

use crate::chain::{CertificateChain, TrustAnchorSet};
use crate::error::{ValidationError, ValidationFailure};
use crate::report::CertificateReport;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const X509_V_ERR_CERT_HAS_EXPIRED: i32 = 10;

/// Verifies `chain` at `now` and builds the report for its leaf.
pub fn validate(
    chain: &CertificateChain,
    now: DateTime<Utc>,
) -> Result<CertificateReport, ValidationError> {
    let anchors = TrustAnchorSet::from_chain(chain);
    debug!("verifying leaf against {} anchor(s)", anchors.len());
    verify_leaf(chain.leaf(), &anchors, now)?;
    debug!("certificate chain verified");

    let leaf = chain.leaf();
    let not_after = asn1_to_datetime(leaf.not_after(), "not_after")?;

    Ok(CertificateReport {
        subject: format_name(leaf.subject_name())?,
        common_name: common_name(leaf.subject_name())?,
        sans: dns_sans(leaf),
        not_after,
        days_remaining: truncate_to_days(not_after - now),
    })
}

/// Runs X.509 path validation of `leaf` against `anchors` at `now`.
///
/// Every certificate is valid through its `notAfter` second inclusive.
/// Hostname, purpose and revocation are not checked.
pub fn verify_leaf(
    leaf: &X509Ref,
    anchors: &TrustAnchorSet,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    let failure = match run_verify(leaf, anchors, now.timestamp())? {
        None => return Ok(()),
        Some(failure) => failure,
    };

    // OpenSSL already reports a certificate as expired at its notAfter second.
    if failure.expires_exactly_at(now) {
        debug!("certificate at depth {} expires exactly at {}", failure.depth, now);
        if run_verify(leaf, anchors, now.timestamp() - 1)?.is_none() {
            return Ok(());
        }
    }

    Err(failure.into())
}

struct VerifyFailure {
    result: X509VerifyResult,
    depth: u32,
    /// `notAfter` of the certificate that failed, as unix seconds
    not_after: Option<i64>,
}

impl VerifyFailure {
    fn expires_exactly_at(&self, now: DateTime<Utc>) -> bool {
        self.result.as_raw() == X509_V_ERR_CERT_HAS_EXPIRED
            && now.timestamp_subsec_nanos() == 0
            && self.not_after == Some(now.timestamp())
    }
}

impl From<VerifyFailure> for ValidationError {
    fn from(failure: VerifyFailure) -> Self {
        ValidationFailure::Untrusted {
            code: failure.result.as_raw(),
            reason: failure.result.error_string().to_string(),
            depth: failure.depth,
        }
        .into()
    }
}

fn run_verify(
    leaf: &X509Ref,
    anchors: &TrustAnchorSet,
    at: i64,
) -> Result<Option<VerifyFailure>, ValidationError> {
    let store = anchor_store(anchors, at)?;
    let untrusted: Stack<X509> = Stack::new()?;

    let mut ctx = X509StoreContext::new()?;
    let failure = ctx.init(&store, leaf, &untrusted, |c| {
        if c.verify_cert()? {
            return Ok(None);
        }
        let not_after = match c.current_cert() {
            Some(cert) => Some(asn1_to_unix(cert.not_after())?),
            None => None,
        };
        Ok(Some(VerifyFailure {
            result: c.error(),
            depth: c.error_depth(),
            not_after,
        }))
    })?;
    Ok(failure)
}

fn anchor_store(anchors: &TrustAnchorSet, at: i64) -> Result<X509Store, ValidationError> {
    let mut param = X509VerifyParam::new()?;
    param.set_time(at as _);
    param.set_flags(X509VerifyFlags::PARTIAL_CHAIN)?;

    let mut builder = X509StoreBuilder::new()?;
    for anchor in anchors.iter() {
        builder.add_cert(anchor.clone())?;
    }
    builder.set_param(&param)?;
    Ok(builder.build())
}

/// Whole days in `delta`, truncated toward zero.
///
/// Partial days are discarded in both directions: 1.9 days is 1 and -1.9
/// days is -1.
pub fn truncate_to_days(delta: TimeDelta) -> i64 {
    // num_seconds rounds toward zero, and so does integer division.
    delta.num_seconds() / SECONDS_PER_DAY
}

fn asn1_to_unix(time: &Asn1TimeRef) -> Result<i64, ErrorStack> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    Ok(i64::from(diff.days) * SECONDS_PER_DAY + i64::from(diff.secs))
}

fn asn1_to_datetime(time: &Asn1TimeRef, field: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::from_timestamp(asn1_to_unix(time)?, 0).ok_or_else(|| {
        ValidationFailure::MalformedCertificate {
            reason: format!("{} is out of range", field),
        }
        .into()
    })
}

/// Renders a distinguished name most-specific attribute first, e.g.
/// `CN=example.com,O=Example,C=US`.
fn format_name(name: &X509NameRef) -> Result<String, ValidationError> {
    let mut parts = Vec::new();
    for entry in name.entries() {
        let key = match entry.object().nid().short_name() {
            Ok(short) => short.to_string(),
            Err(_) => entry.object().to_string(),
        };
        parts.push(format!("{}={}", key, entry_text(entry.data())?));
    }
    parts.reverse();
    Ok(parts.join(","))
}

fn common_name(name: &X509NameRef) -> Result<String, ValidationError> {
    match name.entries_by_nid(Nid::COMMONNAME).next() {
        Some(entry) => entry_text(entry.data()),
        None => Ok(String::new()),
    }
}

fn entry_text(data: &openssl::asn1::Asn1StringRef) -> Result<String, ValidationError> {
    data.as_utf8().map(|s| s.to_string()).map_err(|e| {
        ValidationFailure::MalformedCertificate {
            reason: format!("subject attribute is not valid text: {}", e),
        }
        .into()
    })
}

fn dns_sans(cert: &X509Ref) -> Vec<String> {
    match cert.subject_alt_names() {
        Some(names) => names
            .iter()
            .filter_map(|n| n.dnsname())
            .map(|n| n.to_string())
            .collect(),
        None => Vec::new(),
    }
}
