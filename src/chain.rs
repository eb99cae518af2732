//! Peer certificate chains and the trust anchors derived from them.

use openssl::x509::{X509Ref, X509};

/// Certificates presented by a server, leaf first. Never empty.
#[derive(Clone)]
pub struct CertificateChain {
    certs: Vec<X509>,
}

#[allow(clippy::len_without_is_empty)]
impl CertificateChain {
    /// Wraps `certs`, returning `None` when there is no leaf.
    pub fn new(certs: Vec<X509>) -> Option<Self> {
        if certs.is_empty() {
            None
        } else {
            Some(CertificateChain { certs })
        }
    }

    /// The certificate identifying the connected host.
    pub fn leaf(&self) -> &X509Ref {
        &self.certs[0]
    }

    /// Everything the server sent after the leaf.
    pub fn rest(&self) -> &[X509] {
        &self.certs[1..]
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }
}

impl std::fmt::Debug for CertificateChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateChain")
            .field("len", &self.certs.len())
            .finish()
    }
}

/// Certificates a verifier will accept as path terminators.
///
/// Built from every non-leaf certificate of a chain. Duplicates are kept.
#[derive(Clone)]
pub struct TrustAnchorSet {
    anchors: Vec<X509>,
}

impl TrustAnchorSet {
    pub fn from_chain(chain: &CertificateChain) -> Self {
        TrustAnchorSet {
            anchors: chain.rest().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &X509> {
        self.anchors.iter()
    }
}

impl std::fmt::Debug for TrustAnchorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchorSet")
            .field("len", &self.anchors.len())
            .finish()
    }
}
