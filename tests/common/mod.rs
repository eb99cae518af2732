#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509NameBuilder, X509};

use tlsdays::CertificateChain;

static SERIAL: AtomicU32 = AtomicU32::new(1);

/// A fixed verification instant, 2027-01-15 12:00:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 1, 15, 12, 0, 0).unwrap()
}

/// A certificate together with its private key.
pub struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

/// Describes a certificate to generate.
pub struct CertSpec<'a> {
    pub common_name: Option<&'a str>,
    pub organization: Option<&'a str>,
    pub sans: &'a [&'a str],
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_ca: bool,
}

impl<'a> CertSpec<'a> {
    pub fn ca(common_name: &'a str, now: DateTime<Utc>) -> Self {
        CertSpec {
            common_name: Some(common_name),
            organization: Some("Test Org"),
            sans: &[],
            not_before: now - TimeDelta::days(30),
            not_after: now + TimeDelta::days(365),
            is_ca: true,
        }
    }

    pub fn leaf(common_name: &'a str, sans: &'a [&'a str], now: DateTime<Utc>) -> Self {
        CertSpec {
            common_name: Some(common_name),
            organization: Some("Test Org"),
            sans,
            not_before: now - TimeDelta::days(1),
            not_after: now + TimeDelta::days(10) + TimeDelta::hours(3),
            is_ca: false,
        }
    }

    pub fn valid_between(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }
}

fn new_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn asn1(t: DateTime<Utc>) -> Asn1Time {
    Asn1Time::from_unix(t.timestamp() as _).unwrap()
}

/// Generates a certificate signed by `issuer`, or self-signed when `None`.
pub fn issue(spec: &CertSpec<'_>, issuer: Option<&Issued>) -> Issued {
    let key = new_key();

    let mut name = X509NameBuilder::new().unwrap();
    if let Some(org) = spec.organization {
        name.append_entry_by_nid(Nid::ORGANIZATIONNAME, org).unwrap();
    }
    if let Some(cn) = spec.common_name {
        name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    }
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(SERIAL.fetch_add(1, Ordering::SeqCst))
        .unwrap()
        .to_asn1_integer()
        .unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&asn1(spec.not_before)).unwrap();
    builder.set_not_after(&asn1(spec.not_after)).unwrap();

    if spec.is_ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    } else {
        builder
            .append_extension(BasicConstraints::new().critical().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(issuer.map(|i| &*i.cert), None))
        .unwrap();
    builder.append_extension(ski).unwrap();

    if let Some(issuer) = issuer {
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(&*issuer.cert), None))
            .unwrap();
        builder.append_extension(aki).unwrap();
    }

    if !spec.sans.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for dns in spec.sans {
            san.dns(dns);
        }
        let san = san
            .build(&builder.x509v3_context(issuer.map(|i| &*i.cert), None))
            .unwrap();
        builder.append_extension(san).unwrap();
    }

    let signing_key = issuer.map(|i| &i.key).unwrap_or(&key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();

    Issued {
        cert: builder.build(),
        key,
    }
}

pub fn chain_of(certs: &[&X509]) -> CertificateChain {
    CertificateChain::new(certs.iter().map(|c| (*c).clone()).collect()).unwrap()
}

/// A TLS server on loopback that serves one handshake and then exits.
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn join(self) {
        self.handle.join().unwrap();
    }
}

/// Serves `leaf` followed by `extra` as its chain.
pub fn serve_chain(leaf: &Issued, extra: &[&X509]) -> TestServer {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&leaf.key).unwrap();
    acceptor.set_certificate(&leaf.cert).unwrap();
    for cert in extra {
        acceptor.add_extra_chain_cert((*cert).clone()).unwrap();
    }
    acceptor.check_private_key().unwrap();
    let acceptor = acceptor.build();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            if let Ok(mut tls) = acceptor.accept(stream) {
                // Wait for the client's close_notify.
                let mut buf = [0u8; 64];
                let _ = tls.read(&mut buf);
                let _ = tls.shutdown();
            }
        }
    });

    TestServer { addr, handle }
}

/// A plain TCP server that answers the handshake with HTTP.
pub fn serve_plaintext() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        }
    });
    TestServer { addr, handle }
}

/// A TCP server that accepts and then stays silent for `hold`.
pub fn serve_silent(hold: Duration) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(hold);
            drop(stream);
        }
    });
    TestServer { addr, handle }
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
