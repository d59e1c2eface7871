//! Blocking digest-signer seam for the synchronous callback boundary.
//!
//! The platform signing subsystem invokes its digest-signing callback on the
//! calling thread and expects an immediate return; there is no suspension
//! point. The remote signing operation is network I/O and therefore async.
//! [`RemoteDigestSigner`] bridges the two by owning a dedicated
//! single-threaded runtime and running the async call to completion, blocking
//! the calling thread for the duration of the round trip.

use crate::domain::crypto::{DigestBytes, SignatureBytes};
use crate::domain::types::KeyReference;
use crate::infra::error::{SigningError, SigningResult};

use super::client::{CustodyClient, CustodyClientConfig};

/// Synchronous digest-signing seam.
///
/// Given a precomputed digest, produce the raw signature bytes. Called from
/// the platform's digest-signing callback; implementations must block until
/// the signature is available or fail the whole operation.
pub trait DigestSigner: Send {
    /// Sign a digest.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::DigestSigningError`] when the signature cannot
    /// be produced. No partial signature is ever returned.
    fn sign_digest(&self, digest: &DigestBytes) -> SigningResult<SignatureBytes>;
}

/// Digest signer backed by the remote custody service.
///
/// Each `sign_digest` call performs exactly one remote round trip; there is
/// no automatic retry, and cancellation mid-flight is not supported. A stuck
/// remote call stalls the calling thread until the client timeout fires.
///
/// Must not be called from inside an async runtime: the dedicated runtime's
/// `block_on` would panic. The signing orchestration is synchronous end to
/// end, so this does not arise in normal use.
pub struct RemoteDigestSigner {
    client: CustodyClient,
    key: KeyReference,
    runtime: tokio::runtime::Runtime,
}

impl RemoteDigestSigner {
    /// Create a signer for one custody-held key.
    ///
    /// # Errors
    /// Returns error if the HTTP client or the runtime cannot be created.
    pub fn new(config: CustodyClientConfig, key: KeyReference) -> SigningResult<Self> {
        let client = CustodyClient::new(config)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                SigningError::ConfigurationError(format!("Failed to create runtime: {e}"))
            })?;
        Ok(Self {
            client,
            key,
            runtime,
        })
    }

    /// The key this signer references.
    #[must_use]
    pub fn key(&self) -> &KeyReference {
        &self.key
    }
}

impl DigestSigner for RemoteDigestSigner {
    fn sign_digest(&self, digest: &DigestBytes) -> SigningResult<SignatureBytes> {
        log::debug!(
            "Requesting remote signature for {} digest ({} bytes)",
            digest.algorithm().as_str(),
            digest.as_slice().len()
        );
        let result = self
            .runtime
            .block_on(self.client.sign_digest(&self.key, digest));
        match result {
            Ok(signature) => Ok(signature),
            // Everything that fails here failed while producing a signature.
            Err(SigningError::DigestSigningError(message)) => {
                Err(SigningError::DigestSigningError(message))
            }
            Err(other) => Err(SigningError::DigestSigningError(other.to_string())),
        }
    }
}
