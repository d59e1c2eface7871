use std::fmt;

use der::Encode;
use x509_cert::Certificate;

use crate::infra::error::{SigningError, SigningResult};

/// Ordered certificate chain, leaf first, toward the root or the furthest
/// reachable issuer.
///
/// The chain asserts linkage only, never trust: it exists to accompany a
/// signature, not to validate one.
#[derive(Clone)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
    der: Vec<Vec<u8>>,
}

impl CertificateChain {
    /// Wrap an already-ordered, non-empty sequence of certificates.
    pub fn new(certificates: Vec<Certificate>) -> SigningResult<Self> {
        if certificates.is_empty() {
            return Err(SigningError::ChainBuildError(
                "Certificate chain must not be empty".to_string(),
            ));
        }
        let der = certificates
            .iter()
            .map(|cert| {
                cert.to_der().map_err(|e| {
                    SigningError::CertificateError(format!(
                        "Failed to encode chain certificate: {e}"
                    ))
                })
            })
            .collect::<SigningResult<Vec<_>>>()?;
        Ok(Self { certificates, der })
    }

    /// The end-entity certificate the chain was built from.
    #[must_use]
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    /// DER encoding of the leaf certificate.
    #[must_use]
    pub fn leaf_der(&self) -> &[u8] {
        &self.der[0]
    }

    #[must_use]
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// DER encodings in chain order.
    #[must_use]
    pub fn der_certificates(&self) -> &[Vec<u8>] {
        &self.der
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false // invariant: constructed non-empty
    }
}

impl fmt::Debug for CertificateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateChain(len={})", self.certificates.len())
    }
}

/// In-memory certificate store.
///
/// Holds the DER encoding of every certificate in the signing chain so the
/// platform signing subsystem can look certificates up by subject while
/// assembling the signature. Read-only after construction; torn down exactly
/// once when dropped.
#[derive(Default)]
pub struct MemoryCertificateStore {
    certificates: Vec<Vec<u8>>,
}

impl MemoryCertificateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a DER-encoded certificate to the store.
    pub fn add(&mut self, der: Vec<u8>) {
        self.certificates.push(der);
    }

    /// All certificates in insertion order.
    #[must_use]
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

impl fmt::Debug for MemoryCertificateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryCertificateStore(certificates={})",
            self.certificates.len()
        )
    }
}
