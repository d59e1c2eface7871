//! Platform signing subsystem boundary.
//!
//! The subsystem that parses the subject file, computes its digest, and
//! embeds the finished signature is a platform capability, not something this
//! crate reimplements. This module defines the seam: an assembled request
//! plus a digest-signing callback go in, an integer status comes out (zero is
//! success, anything else is the platform error code).
//!
//! On Windows the seam is implemented over `mssign32`'s `SignerSignEx3`
//! (see `Mssign32Subsystem`). Other targets compile only the trait so the
//! orchestrator can be driven by a substitute subsystem.

#[cfg(windows)]
mod mssign32;

#[cfg(windows)]
pub use mssign32::Mssign32Subsystem;

use crate::domain::crypto::SignatureBytes;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::request_assembler::SigningRequest;

/// dwFlags / timestamp-flag bits understood by the signing boundary.
pub mod flags {
    /// Exclude per-page hashes from the signature.
    pub const SPC_EXC_PE_PAGE_HASHES: u32 = 0x0000_0010;
    /// Include per-page hashes in the signature.
    pub const SPC_INC_PE_PAGE_HASHES: u32 = 0x0000_0020;
    /// Sign through the digest-signing callback instead of a local key.
    pub const SIGNER_DIGEST_SIGN: u32 = 0x0000_0400;

    /// Legacy Authenticode-style timestamp.
    pub const TIMESTAMP_AUTHENTICODE: u32 = 0x0000_0001;
    /// RFC 3161 timestamp.
    pub const TIMESTAMP_RFC3161: u32 = 0x0000_0002;
}

/// Status returned by a successful subsystem invocation.
pub const STATUS_SUCCESS: i32 = 0;

/// Status propagated when the digest-signing callback fails (E_FAIL).
pub const STATUS_CALLBACK_FAILED: i32 = 0x8000_4005_u32 as i32;

/// Data handed to the digest-signing callback by the subsystem.
#[derive(Debug)]
pub struct DigestSignInput<'a> {
    /// DER encoding of the signing certificate context.
    pub certificate_der: &'a [u8],
    /// Platform ALG_ID of the digest algorithm.
    pub algorithm_id: u32,
    /// The precomputed digest to sign. Never the file content.
    pub digest: &'a [u8],
}

/// Digest-signing callback: must produce the raw signature bytes for the
/// supplied digest, synchronously from the subsystem's point of view.
pub type DigestSignCallback<'a> =
    dyn FnMut(DigestSignInput<'_>) -> SigningResult<SignatureBytes> + 'a;

/// The native signing subsystem seam.
///
/// Implementations invoke `callback` zero or more times (typically once) on
/// the calling thread, strictly between receiving the request and embedding
/// the signature. A callback failure must abort the signing attempt with a
/// nonzero status.
pub trait SigningSubsystem: Send {
    fn sign(&self, request: &SigningRequest<'_>, callback: &mut DigestSignCallback<'_>) -> i32;
}

/// The platform's own signing subsystem, when one exists for this target.
///
/// # Errors
///
/// Returns [`SigningError::ConfigurationError`] on targets without an
/// Authenticode signing subsystem.
pub fn default_subsystem() -> SigningResult<Box<dyn SigningSubsystem>> {
    #[cfg(windows)]
    {
        Ok(Box::new(Mssign32Subsystem::new()))
    }
    #[cfg(not(windows))]
    {
        Err(SigningError::ConfigurationError(
            "The platform signing subsystem is only available on Windows".to_string(),
        ))
    }
}
