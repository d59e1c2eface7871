//! Protocol definitions for the key-custody service.
//!
//! Defines the JSON message format exchanged with the custody service for
//! digest signing, certificate retrieval, and health checks.

use serde::{Deserialize, Serialize};

use crate::domain::crypto::DigestBytes;
use crate::domain::types::KeyReference;

/// API version for protocol compatibility checks.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Request to sign a digest with a custody-held key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignDigestRequest {
    /// Protocol version for compatibility checking.
    pub version: String,
    /// Identifier of the custody-held key.
    pub key_id: String,
    /// Digest algorithm name (e.g. "sha256").
    pub algorithm: String,
    /// Base64-encoded digest to sign.
    pub digest_b64: String,
}

impl SignDigestRequest {
    #[must_use]
    pub fn new(key: &KeyReference, digest: &DigestBytes) -> Self {
        use base64::Engine;
        Self {
            version: PROTOCOL_VERSION.to_string(),
            key_id: key.as_str().to_string(),
            algorithm: digest.algorithm().as_str().to_string(),
            digest_b64: base64::engine::general_purpose::STANDARD.encode(digest.as_slice()),
        }
    }

    /// Decode the digest from base64.
    ///
    /// # Errors
    /// Returns error if base64 decoding fails.
    pub fn decode_digest(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.digest_b64)
    }
}

/// Response containing the signature over a digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignDigestResponse {
    /// Protocol version.
    pub version: String,
    /// Base64-encoded raw signature bytes.
    pub signature_b64: String,
}

impl SignDigestResponse {
    #[must_use]
    pub fn from_signature(signature: &[u8]) -> Self {
        use base64::Engine;
        Self {
            version: PROTOCOL_VERSION.to_string(),
            signature_b64: base64::engine::general_purpose::STANDARD.encode(signature),
        }
    }

    /// Decode the signature from base64.
    ///
    /// # Errors
    /// Returns error if base64 decoding fails.
    pub fn decode_signature(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.signature_b64)
    }
}

/// Request for the public certificate associated with a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCertificateRequest {
    /// Protocol version.
    pub version: String,
    /// Identifier of the custody-held key.
    pub key_id: String,
}

impl GetCertificateRequest {
    #[must_use]
    pub fn new(key: &KeyReference) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            key_id: key.as_str().to_string(),
        }
    }
}

/// Response containing the certificate for a custody-held key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCertificateResponse {
    /// Protocol version.
    pub version: String,
    /// Base64-encoded DER certificate bytes.
    pub certificate_der_b64: String,
}

impl GetCertificateResponse {
    /// Decode the certificate DER from base64.
    ///
    /// # Errors
    /// Returns error if base64 decoding fails.
    pub fn decode_certificate(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.certificate_der_b64)
    }
}

/// Health check / status request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Protocol version.
    pub version: String,
}

impl StatusRequest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

impl Default for StatusRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Status response with custody service information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Protocol version.
    pub version: String,
    /// Whether the service is ready to sign.
    pub ready: bool,
    /// Key identifiers the caller may reference.
    pub available_keys: Vec<String>,
    /// Service uptime in seconds.
    pub uptime_seconds: u64,
}

/// Error response returned by the custody service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (see [`error_codes`]).
    pub error_code: String,
    /// Human-readable message.
    pub message: String,
}

/// Error codes returned by the custody service.
pub mod error_codes {
    pub const AUTH_FAILED: &str = "auth_failed";
    pub const KEY_NOT_FOUND: &str = "key_not_found";
    pub const UNSUPPORTED_ALGORITHM: &str = "unsupported_algorithm";
    pub const SIGNING_FAILED: &str = "signing_failed";
    pub const CERT_NOT_FOUND: &str = "cert_not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crypto::HashAlgorithm;

    #[test]
    fn sign_request_round_trips_digest() {
        let key = KeyReference::new("codesign-2024").unwrap();
        let digest = DigestBytes::new(HashAlgorithm::Sha256, vec![0x42; 32]).unwrap();
        let request = SignDigestRequest::new(&key, &digest);

        assert_eq!(request.version, PROTOCOL_VERSION);
        assert_eq!(request.key_id, "codesign-2024");
        assert_eq!(request.algorithm, "sha256");
        assert_eq!(request.decode_digest().unwrap(), vec![0x42; 32]);
    }

    #[test]
    fn sign_request_serializes_to_expected_json_shape() {
        let key = KeyReference::new("k1").unwrap();
        let digest = DigestBytes::new(HashAlgorithm::Sha1, vec![0; 20]).unwrap();
        let json = serde_json::to_value(SignDigestRequest::new(&key, &digest)).unwrap();

        assert_eq!(json["key_id"], "k1");
        assert_eq!(json["algorithm"], "sha1");
        assert!(json["digest_b64"].is_string());
    }

    #[test]
    fn sign_response_round_trips_signature() {
        let response = SignDigestResponse::from_signature(&[1, 2, 3, 4]);
        assert_eq!(response.decode_signature().unwrap(), vec![1, 2, 3, 4]);

        let serialized = serde_json::to_string(&response).unwrap();
        let parsed: SignDigestResponse = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.decode_signature().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn error_response_parses() {
        let raw = r#"{"error_code":"signing_failed","message":"key disabled"}"#;
        let parsed: ErrorResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.error_code, error_codes::SIGNING_FAILED);
        assert_eq!(parsed.message, "key disabled");
    }
}
