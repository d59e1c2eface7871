//! Certificate chain construction from a leaf and an unordered helper pool.
//!
//! Chain trust is deliberately not validated by default: the output
//! accompanies a signature, it does not assert trustworthiness. Only the
//! issuer/subject linkage matters.

use std::time::{SystemTime, UNIX_EPOCH};

use x509_cert::Certificate;

use crate::domain::crypto::{CertificateChain, MemoryCertificateStore};
use crate::infra::error::{SigningError, SigningResult};

/// Policy for one chain build, visible at the call site.
#[derive(Debug, Clone, Copy)]
pub struct ChainBuildOptions {
    /// When true (the normal signing configuration), trust defects such as
    /// expired chain elements are ignored and only linkage is required.
    pub ignore_trust_errors: bool,
}

impl Default for ChainBuildOptions {
    fn default() -> Self {
        Self {
            ignore_trust_errors: true,
        }
    }
}

/// Builds ordered certificate chains by issuer/subject linkage.
pub struct ChainBuilder;

impl ChainBuilder {
    /// Build the longest linkable chain from `leaf` toward a root, resolving
    /// missing issuers from `additional_certificates` (an unordered pool).
    ///
    /// On success every chain certificate is inserted into `store`, leaf
    /// first, for later lookup by the platform signing subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::ChainBuildError`] when the leaf is not
    /// self-issued and no issuer for it can be resolved from the pool, or,
    /// with `ignore_trust_errors` disabled, when any chain element is outside
    /// its validity window.
    pub fn build_chain(
        leaf: &Certificate,
        additional_certificates: &[Certificate],
        options: &ChainBuildOptions,
        store: &mut MemoryCertificateStore,
    ) -> SigningResult<CertificateChain> {
        let mut chain = vec![leaf.clone()];
        let mut used = vec![false; additional_certificates.len()];

        let mut current = leaf;
        while !Self::is_self_issued(current) {
            let issuer = additional_certificates.iter().enumerate().find(|(i, cert)| {
                !used[*i] && cert.tbs_certificate.subject == current.tbs_certificate.issuer
            });
            match issuer {
                Some((i, cert)) => {
                    used[i] = true;
                    chain.push(cert.clone());
                    current = cert;
                }
                None if chain.len() == 1 => {
                    // Not even a trivial link: the leaf names an issuer nobody
                    // in the pool can satisfy.
                    return Err(SigningError::ChainBuildError(format!(
                        "No linkable issuer for certificate {}",
                        leaf.tbs_certificate.subject
                    )));
                }
                // Furthest reachable; stop here.
                None => break,
            }
        }

        if !options.ignore_trust_errors {
            for cert in &chain {
                Self::check_validity_window(cert)?;
            }
        }

        let chain = CertificateChain::new(chain)?;
        for der in chain.der_certificates() {
            store.add(der.clone());
        }
        log::debug!(
            "Built certificate chain of {} element(s) for {}",
            chain.len(),
            chain.leaf().tbs_certificate.subject
        );
        Ok(chain)
    }

    fn is_self_issued(cert: &Certificate) -> bool {
        cert.tbs_certificate.subject == cert.tbs_certificate.issuer
    }

    fn check_validity_window(cert: &Certificate) -> SigningResult<()> {
        let validity = &cert.tbs_certificate.validity;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let not_before = validity.not_before.to_unix_duration();
        let not_after = validity.not_after.to_unix_duration();
        if now < not_before {
            return Err(SigningError::ChainBuildError(format!(
                "Certificate {} is not yet valid",
                cert.tbs_certificate.subject
            )));
        }
        if now > not_after {
            return Err(SigningError::ChainBuildError(format!(
                "Certificate {} has expired",
                cert.tbs_certificate.subject
            )));
        }
        Ok(())
    }
}
