//! Error types for custody-backed signing operations.

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Error types for custody-backed signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    /// No certificate chain could be built from the leaf and the supplied
    /// extra certificates. Fatal at signer construction.
    #[error("Chain build error: {0}")]
    ChainBuildError(String),

    /// The remote custody service failed to produce a signature for a digest.
    /// Raised inside the digest-signing callback and aborts the sign call.
    #[error("Digest signing error: {0}")]
    DigestSigningError(String),

    /// The platform signing subsystem returned a nonzero status for a reason
    /// other than the digest-signing callback.
    #[error("Platform signing subsystem failed with status {status:#010x}")]
    NativeSigningError { status: i32 },

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1Error(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl SigningError {
    /// The raw platform status for [`SigningError::NativeSigningError`],
    /// `None` for every other variant.
    #[must_use]
    pub fn native_status(&self) -> Option<i32> {
        match self {
            SigningError::NativeSigningError { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::Asn1Error(error.to_string())
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(error: reqwest::Error) -> Self {
        SigningError::NetworkError(error.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SigningError::ChainBuildError("no linkable issuer".to_string());
        assert_eq!(error.to_string(), "Chain build error: no linkable issuer");

        let error = SigningError::DigestSigningError("custody service 503".to_string());
        assert_eq!(
            error.to_string(),
            "Digest signing error: custody service 503"
        );
    }

    #[test]
    fn test_native_status_formatting() {
        let error = SigningError::NativeSigningError {
            status: 0x8000_4005_u32 as i32,
        };
        assert_eq!(
            error.to_string(),
            "Platform signing subsystem failed with status 0x80004005"
        );
        assert_eq!(error.native_status(), Some(0x8000_4005_u32 as i32));
        assert_eq!(SigningError::IoError("x".to_string()).native_status(), None);
    }
}
