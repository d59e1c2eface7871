//! Translates caller intent into the request the platform boundary consumes.
//!
//! Assembly is pure data manipulation: the assembled request borrows from the
//! orchestrator and the call arguments, and every native resource it implies
//! (wide strings, store handles, context receivers) is materialized and
//! released inside the platform adapter, per acquisition, on every exit path.

use std::path::Path;
use std::str::FromStr;

use crate::adapters::platform::flags;
use crate::domain::crypto::{HashAlgorithm, MemoryCertificateStore};
use crate::domain::types::TimestampUrl;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::signing::TimestampConfiguration;

/// Whether per-page hashes of the executable are included in the signature.
///
/// `PlatformDefault` leaves the choice to the signing subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHashing {
    Include,
    Exclude,
    PlatformDefault,
}

impl FromStr for PageHashing {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "include" => Ok(PageHashing::Include),
            "exclude" => Ok(PageHashing::Exclude),
            "default" | "platform-default" => Ok(PageHashing::PlatformDefault),
            other => Err(SigningError::ValidationError(format!(
                "Unknown page hashing mode: {other}"
            ))),
        }
    }
}

/// One fully assembled signing request, built fresh per sign call.
#[derive(Debug)]
pub struct SigningRequest<'a> {
    /// The file to sign.
    pub path: &'a Path,
    /// Signature description, shown by the platform as the program name.
    pub description: Option<&'a str>,
    /// URL with more information about the signed content.
    pub description_url: Option<&'a str>,
    /// dwFlags bits for the subsystem (callback signing + page hashing).
    pub flags: u32,
    /// Digest algorithm for the file hash.
    pub digest_algorithm: HashAlgorithm,
    /// Timestamp flag bits; zero when no timestamp was requested.
    pub timestamp_flags: u32,
    /// Resolved digest-algorithm OID for RFC 3161 requests.
    pub timestamp_algorithm_oid: Option<&'static str>,
    /// Timestamp authority URL, when a timestamp was requested.
    pub timestamp_url: Option<&'a TimestampUrl>,
    /// DER encoding of the signing (leaf) certificate.
    pub certificate_der: &'a [u8],
    /// Store holding the full signing chain for subsystem lookups.
    pub certificate_store: &'a MemoryCertificateStore,
}

impl SigningRequest<'_> {
    /// True when the request asks for any timestamp.
    #[must_use]
    pub fn wants_timestamp(&self) -> bool {
        self.timestamp_flags != 0
    }
}

/// Builds [`SigningRequest`] values.
pub struct RequestAssembler;

impl RequestAssembler {
    #[allow(clippy::too_many_arguments)]
    pub fn assemble<'a>(
        path: &'a Path,
        description: Option<&'a str>,
        description_url: Option<&'a str>,
        page_hashing: PageHashing,
        digest_algorithm: HashAlgorithm,
        timestamp: &'a TimestampConfiguration,
        certificate_der: &'a [u8],
        certificate_store: &'a MemoryCertificateStore,
    ) -> SigningResult<SigningRequest<'a>> {
        let mut dw_flags = flags::SIGNER_DIGEST_SIGN;
        match page_hashing {
            PageHashing::Include => dw_flags |= flags::SPC_INC_PE_PAGE_HASHES,
            PageHashing::Exclude => dw_flags |= flags::SPC_EXC_PE_PAGE_HASHES,
            PageHashing::PlatformDefault => {}
        }

        let (timestamp_flags, timestamp_algorithm_oid, timestamp_url) = match timestamp {
            TimestampConfiguration::None => (0, None, None),
            TimestampConfiguration::Authenticode { url } => {
                (flags::TIMESTAMP_AUTHENTICODE, None, Some(url))
            }
            TimestampConfiguration::Rfc3161 {
                url,
                digest_algorithm,
            } => (
                flags::TIMESTAMP_RFC3161,
                Some(digest_algorithm.oid()),
                Some(url),
            ),
        };

        if certificate_der.is_empty() {
            return Err(SigningError::CertificateError(
                "Signing request requires a certificate".to_string(),
            ));
        }

        Ok(SigningRequest {
            path,
            description,
            description_url,
            flags: dw_flags,
            digest_algorithm,
            timestamp_flags,
            timestamp_algorithm_oid,
            timestamp_url,
            certificate_der,
            certificate_store,
        })
    }
}
