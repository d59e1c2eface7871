//! Cryptographic domain types.
//!
//! Provides the `HashAlgorithm` enumeration with the platform identifier
//! translations the signing boundary needs, plus strongly typed digest,
//! signature, and certificate-chain wrappers.

mod cert;
mod digest_bytes;
mod signature;

pub use cert::{CertificateChain, MemoryCertificateStore};
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use signature::SignatureBytes;

use std::str::FromStr;

use crate::infra::error::SigningError;

/// Supported file digest algorithms.
///
/// SHA-1 is accepted for compatibility with legacy timestamp authorities and
/// old file digests; new signatures should use SHA-256 or stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    #[must_use]
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// The dotted-decimal OID string the platform expects for this algorithm,
    /// e.g. in the RFC 3161 timestamp sub-request.
    #[must_use]
    pub fn oid(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "1.3.14.3.2.26",
            HashAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            HashAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            HashAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// The platform ALG_ID constant for this algorithm, as surfaced to the
    /// digest-signing callback.
    #[must_use]
    pub fn alg_id(&self) -> u32 {
        match self {
            HashAlgorithm::Sha1 => 0x0000_8004,
            HashAlgorithm::Sha256 => 0x0000_800C,
            HashAlgorithm::Sha384 => 0x0000_800D,
            HashAlgorithm::Sha512 => 0x0000_800E,
        }
    }

    /// Reverse translation from a platform ALG_ID.
    #[must_use]
    pub fn from_alg_id(alg_id: u32) -> Option<Self> {
        match alg_id {
            0x0000_8004 => Some(HashAlgorithm::Sha1),
            0x0000_800C => Some(HashAlgorithm::Sha256),
            0x0000_800D => Some(HashAlgorithm::Sha384),
            0x0000_800E => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(SigningError::ValidationError(format!(
                "Unsupported digest algorithm: {other}"
            ))),
        }
    }
}
