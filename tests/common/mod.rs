//! Shared fixtures: synthetic certificates and an in-memory signing
//! subsystem that replays the platform contract against real files.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use der::asn1::{BitString, ObjectIdentifier, UtcTime};
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;

use custody_signer::adapters::platform::{
    DigestSignCallback, DigestSignInput, SigningSubsystem, STATUS_CALLBACK_FAILED, STATUS_SUCCESS,
};
use custody_signer::{
    DigestBytes, DigestSigner, HashAlgorithm, SignatureBytes, SigningError, SigningRequest,
    SigningResult,
};

const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// 2020-01-01T00:00:00Z
pub const VALID_FROM: u64 = 1_577_836_800;
/// 2040-01-01T00:00:00Z
pub const VALID_UNTIL: u64 = 2_208_988_800;

/// Build a certificate with the given subject/issuer linkage and validity.
///
/// The key and signature are placeholders: chain building reads only the
/// subject, issuer, and validity fields.
pub fn make_certificate_with_validity(
    subject: &str,
    issuer: &str,
    serial: u8,
    not_before: u64,
    not_after: u64,
) -> Certificate {
    let algorithm = AlgorithmIdentifierOwned {
        oid: SHA256_WITH_RSA,
        parameters: None,
    };
    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[serial]).expect("serial"),
        signature: algorithm.clone(),
        issuer: Name::from_str(issuer).expect("issuer name"),
        validity: Validity {
            not_before: Time::UtcTime(
                UtcTime::from_unix_duration(Duration::from_secs(not_before)).expect("not_before"),
            ),
            not_after: Time::UtcTime(
                UtcTime::from_unix_duration(Duration::from_secs(not_after)).expect("not_after"),
            ),
        },
        subject: Name::from_str(subject).expect("subject name"),
        subject_public_key_info: SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: RSA_ENCRYPTION,
                parameters: None,
            },
            subject_public_key: BitString::from_bytes(&[0x30, 0x03, 0x02, 0x01, serial])
                .expect("public key"),
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };
    Certificate {
        tbs_certificate,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&[0u8; 8]).expect("signature"),
    }
}

pub fn make_certificate(subject: &str, issuer: &str, serial: u8) -> Certificate {
    make_certificate_with_validity(subject, issuer, serial, VALID_FROM, VALID_UNTIL)
}

/// Leaf -> intermediate -> self-signed root.
pub fn make_three_level_chain() -> (Certificate, Certificate, Certificate) {
    let root = make_certificate("CN=Test Root", "CN=Test Root", 3);
    let intermediate = make_certificate("CN=Test Intermediate", "CN=Test Root", 2);
    let leaf = make_certificate("CN=Test Leaf", "CN=Test Intermediate", 1);
    (leaf, intermediate, root)
}

/// Trailer magic appended by [`ReplaySubsystem`] in place of a real
/// signature section.
pub const TRAILER_MAGIC: &[u8; 8] = b"SIGTRAIL";

/// Status the replay subsystem returns when the subject file is unreadable.
pub const STATUS_BAD_FILE: i32 = 0x8007_0002_u32 as i32;

/// In-memory stand-in for the platform signing subsystem.
///
/// Follows the platform contract: digests the subject file, invokes the
/// digest-signing callback exactly once on the calling thread, and embeds the
/// returned signature — here as a trailer, replacing any previous one so
/// re-signing is idempotent. On callback failure the file is not touched.
pub struct ReplaySubsystem {
    calls: Arc<AtomicUsize>,
}

impl ReplaySubsystem {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn digest(algorithm: HashAlgorithm, content: &[u8]) -> Vec<u8> {
        match algorithm {
            HashAlgorithm::Sha1 => {
                // The replay subsystem only supports SHA-2; tests use it that way.
                panic!("sha1 digests are not supported by the replay subsystem")
            }
            HashAlgorithm::Sha256 => Sha256::digest(content).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(content).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(content).to_vec(),
        }
    }

    fn strip_trailer(content: &[u8]) -> &[u8] {
        if content.len() >= TRAILER_MAGIC.len() + 4 && content.ends_with(TRAILER_MAGIC) {
            let len_start = content.len() - TRAILER_MAGIC.len() - 4;
            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&content[len_start..len_start + 4]);
            let signature_len = u32::from_le_bytes(len_bytes) as usize;
            if len_start >= signature_len {
                return &content[..len_start - signature_len];
            }
        }
        content
    }
}

impl SigningSubsystem for ReplaySubsystem {
    fn sign(&self, request: &SigningRequest<'_>, callback: &mut DigestSignCallback<'_>) -> i32 {
        let Ok(raw) = std::fs::read(request.path) else {
            return STATUS_BAD_FILE;
        };
        let content = Self::strip_trailer(&raw).to_vec();
        let digest = Self::digest(request.digest_algorithm, &content);

        self.calls.fetch_add(1, Ordering::SeqCst);
        let input = DigestSignInput {
            certificate_der: request.certificate_der,
            algorithm_id: request.digest_algorithm.alg_id(),
            digest: &digest,
        };
        let signature = match callback(input) {
            Ok(signature) => signature,
            Err(_) => return STATUS_CALLBACK_FAILED,
        };

        let mut signed = content;
        signed.extend_from_slice(signature.as_slice());
        signed.extend_from_slice(&(signature.len() as u32).to_le_bytes());
        signed.extend_from_slice(TRAILER_MAGIC);
        if std::fs::write(request.path, signed).is_err() {
            return STATUS_BAD_FILE;
        }
        STATUS_SUCCESS
    }
}

/// Deterministic digest signer: same digest in, same signature out.
pub struct StaticDigestSigner;

impl DigestSigner for StaticDigestSigner {
    fn sign_digest(&self, digest: &DigestBytes) -> SigningResult<SignatureBytes> {
        let mut bytes = vec![0xA5, 0x5A];
        bytes.extend(digest.as_slice().iter().rev());
        Ok(SignatureBytes::new(bytes))
    }
}

/// Digest signer that always fails, as a custody outage would.
pub struct FailingDigestSigner;

impl DigestSigner for FailingDigestSigner {
    fn sign_digest(&self, _digest: &DigestBytes) -> SigningResult<SignatureBytes> {
        Err(SigningError::DigestSigningError(
            "custody service unavailable".to_string(),
        ))
    }
}
