//! Authenticode signing orchestration over a custody-held key.
//!
//! [`AuthenticodeCustodySigner`] owns everything with a lifetime longer than
//! one sign call: the signing configuration, the certificate chain built at
//! construction, and the in-memory store the platform subsystem reads. Each
//! `sign_file` call assembles a fresh request, hands it to the subsystem, and
//! answers the subsystem's digest-signing callback by blocking on the remote
//! signer.

use std::cell::RefCell;
use std::path::Path;

use der::Decode;
use x509_cert::Certificate;

use crate::adapters::custody::DigestSigner;
use crate::adapters::platform::{self, DigestSignInput, SigningSubsystem};
use crate::domain::crypto::{
    CertificateChain, DigestBytes, HashAlgorithm, MemoryCertificateStore, SignatureBytes,
};
use crate::domain::types::{KeyReference, TimestampUrl};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::chain_builder::{ChainBuildOptions, ChainBuilder};
use crate::services::request_assembler::{PageHashing, RequestAssembler};

/// Signing configuration: the public leaf certificate, the file digest
/// algorithm, and the reference to the custody-held key material.
#[derive(Debug, Clone)]
pub struct SigningConfiguration {
    certificate: Certificate,
    certificate_der: Vec<u8>,
    digest_algorithm: HashAlgorithm,
    key: KeyReference,
}

impl SigningConfiguration {
    /// Create a configuration from a DER-encoded leaf certificate.
    ///
    /// # Errors
    /// Returns error if the certificate cannot be parsed.
    pub fn new(
        certificate_der: Vec<u8>,
        digest_algorithm: HashAlgorithm,
        key: KeyReference,
    ) -> SigningResult<Self> {
        let certificate = Certificate::from_der(&certificate_der).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse signing certificate: {e}"))
        })?;
        Ok(Self {
            certificate,
            certificate_der,
            digest_algorithm,
            key,
        })
    }

    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> HashAlgorithm {
        self.digest_algorithm
    }

    #[must_use]
    pub fn key(&self) -> &KeyReference {
        &self.key
    }
}

/// Timestamp policy, fixed at signer construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampConfiguration {
    /// No timestamp.
    None,
    /// Legacy Authenticode-style timestamp.
    Authenticode { url: TimestampUrl },
    /// RFC 3161 timestamp with an explicit digest algorithm.
    Rfc3161 {
        url: TimestampUrl,
        digest_algorithm: HashAlgorithm,
    },
}

/// Signs files with an Authenticode signature whose private-key operation is
/// delegated to the remote custody service.
///
/// The certificate chain and store are built once at construction and are
/// read-only afterwards; they are released exactly once when the signer is
/// dropped, independent of how many sign calls were made. Signing after
/// disposal is unrepresentable: dropping consumes the signer.
///
/// The signer is not
/// internally concurrent — each `sign_file` call runs to completion on the
/// calling thread. For signing several files in parallel, use one signer per
/// file.
pub struct AuthenticodeCustodySigner {
    configuration: SigningConfiguration,
    timestamp_configuration: TimestampConfiguration,
    chain: CertificateChain,
    certificate_store: MemoryCertificateStore,
    digest_signer: Box<dyn DigestSigner>,
    subsystem: Box<dyn SigningSubsystem>,
}

impl AuthenticodeCustodySigner {
    /// Build a signer.
    ///
    /// Builds the certificate chain from the configured leaf plus
    /// `additional_certificates` (an unordered pool used to resolve missing
    /// intermediates) with trust validation disabled — the chain accompanies
    /// signatures, it does not assert trust.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::ChainBuildError`] if no chain can be built;
    /// the signer is then never constructed.
    pub fn new(
        configuration: SigningConfiguration,
        timestamp_configuration: TimestampConfiguration,
        additional_certificates: &[Certificate],
        digest_signer: Box<dyn DigestSigner>,
        subsystem: Box<dyn SigningSubsystem>,
    ) -> SigningResult<Self> {
        let mut certificate_store = MemoryCertificateStore::new();
        let chain = ChainBuilder::build_chain(
            configuration.certificate(),
            additional_certificates,
            &ChainBuildOptions {
                ignore_trust_errors: true,
            },
            &mut certificate_store,
        )?;
        Ok(Self {
            configuration,
            timestamp_configuration,
            chain,
            certificate_store,
            digest_signer,
            subsystem,
        })
    }

    /// Build a signer over the platform's own signing subsystem.
    ///
    /// # Errors
    /// Returns error on targets without one, or if the chain cannot be built.
    pub fn with_platform_subsystem(
        configuration: SigningConfiguration,
        timestamp_configuration: TimestampConfiguration,
        additional_certificates: &[Certificate],
        digest_signer: Box<dyn DigestSigner>,
    ) -> SigningResult<Self> {
        let subsystem = platform::default_subsystem()?;
        Self::new(
            configuration,
            timestamp_configuration,
            additional_certificates,
            digest_signer,
            subsystem,
        )
    }

    /// The chain built at construction, leaf first.
    #[must_use]
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// The store holding every chain certificate.
    #[must_use]
    pub fn certificate_store(&self) -> &MemoryCertificateStore {
        &self.certificate_store
    }

    /// Sign one file.
    ///
    /// Assembles the signing request, invokes the platform subsystem, and
    /// answers its digest-signing callback by blocking on the remote signer.
    /// On failure the target file is left without an added or modified
    /// signature — the underlying signing call is atomic at the file level,
    /// so there is no partial commit and nothing to roll back.
    ///
    /// # Errors
    ///
    /// [`SigningError::DigestSigningError`] when the remote signer failed,
    /// [`SigningError::NativeSigningError`] for any other nonzero subsystem
    /// status.
    pub fn sign_file(
        &self,
        path: &Path,
        description: Option<&str>,
        description_url: Option<&str>,
        page_hashing: PageHashing,
    ) -> SigningResult<()> {
        log::debug!("Assembling signing request for {}", path.display());
        let request = RequestAssembler::assemble(
            path,
            description,
            description_url,
            page_hashing,
            self.configuration.digest_algorithm(),
            &self.timestamp_configuration,
            self.chain.leaf_der(),
            &self.certificate_store,
        )?;

        // The subsystem only sees pass/fail from the callback; park the real
        // error so the caller gets the digest-signing cause instead of a bare
        // status code.
        let callback_error: RefCell<Option<SigningError>> = RefCell::new(None);
        let mut callback = |input: DigestSignInput<'_>| -> SigningResult<SignatureBytes> {
            log::debug!(
                "Digest signing callback invoked ({} byte digest)",
                input.digest.len()
            );
            let algorithm = HashAlgorithm::from_alg_id(input.algorithm_id)
                .unwrap_or_else(|| self.configuration.digest_algorithm());
            let result = DigestBytes::new(algorithm, input.digest.to_vec())
                .map_err(|e| SigningError::DigestSigningError(e.to_string()))
                .and_then(|digest| self.digest_signer.sign_digest(&digest));
            match result {
                Ok(signature) => Ok(signature),
                Err(error) => {
                    *callback_error.borrow_mut() = Some(match &error {
                        SigningError::DigestSigningError(message) => {
                            SigningError::DigestSigningError(message.clone())
                        }
                        other => SigningError::DigestSigningError(other.to_string()),
                    });
                    Err(error)
                }
            }
        };

        log::debug!("Invoking platform signing subsystem");
        let status = self.subsystem.sign(&request, &mut callback);

        if status == platform::STATUS_SUCCESS {
            log::info!("Signed {}", path.display());
            return Ok(());
        }
        if let Some(error) = callback_error.into_inner() {
            return Err(error);
        }
        Err(SigningError::NativeSigningError { status })
    }
}

impl std::fmt::Debug for AuthenticodeCustodySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticodeCustodySigner")
            .field("key", self.configuration.key())
            .field("digest_algorithm", &self.configuration.digest_algorithm())
            .field("chain", &self.chain)
            .field("timestamp", &self.timestamp_configuration)
            .finish_non_exhaustive()
    }
}
