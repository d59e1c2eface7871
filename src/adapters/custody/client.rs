//! Async HTTP client for the key-custody service.

use super::protocol::{
    error_codes, ErrorResponse, GetCertificateRequest, GetCertificateResponse, SignDigestRequest,
    SignDigestResponse, StatusRequest, StatusResponse,
};
use crate::domain::crypto::{DigestBytes, SignatureBytes};
use crate::domain::types::{AuthToken, KeyReference};
use crate::infra::error::{SigningError, SigningResult};

/// Configuration for connecting to the custody service.
#[derive(Debug, Clone)]
pub struct CustodyClientConfig {
    /// Base URL of the service (e.g. `https://custody.example.com`).
    pub base_url: String,
    /// Bearer token for authentication.
    pub auth_token: AuthToken,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates (should be true in production).
    pub verify_tls: bool,
}

impl CustodyClientConfig {
    /// Create a new custody client configuration.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the custody service
    /// * `auth_token` - Bearer token for authentication
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth_token: AuthToken) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token,
            timeout_secs: 30,
            verify_tls: true,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Disable TLS verification (for testing only!).
    #[must_use]
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

/// Custody service client.
///
/// Performs the network round trips to the service holding the signing key.
/// The service only ever sees digests, never file content.
pub struct CustodyClient {
    config: CustodyClientConfig,
    client: reqwest::Client,
}

impl CustodyClient {
    /// Create a new custody client.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: CustodyClientConfig) -> SigningResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| {
                SigningError::NetworkError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    /// Check the status of the custody service.
    ///
    /// # Errors
    /// Returns error if the service is unreachable or returns an error.
    pub async fn check_status(&self) -> SigningResult<StatusResponse> {
        let url = format!("{}/api/v1/status", self.config.base_url);
        let request = StatusRequest::new();

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.auth_token.as_str()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                SigningError::NetworkError(format!("Failed to connect to custody service: {e}"))
            })?;

        self.handle_response(response).await
    }

    /// Retrieve the public certificate for a custody-held key.
    ///
    /// # Arguments
    /// * `key` - The key reference to retrieve the certificate for
    ///
    /// # Errors
    /// Returns error if the certificate cannot be retrieved.
    pub async fn get_certificate(&self, key: &KeyReference) -> SigningResult<Vec<u8>> {
        let url = format!("{}/api/v1/certificate", self.config.base_url);
        let request = GetCertificateRequest::new(key);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.auth_token.as_str()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                SigningError::NetworkError(format!("Failed to connect to custody service: {e}"))
            })?;

        let cert_response: GetCertificateResponse = self.handle_response(response).await?;

        cert_response.decode_certificate().map_err(|e| {
            SigningError::CertificateError(format!("Failed to decode certificate: {e}"))
        })
    }

    /// Sign a digest with a custody-held key.
    ///
    /// # Arguments
    /// * `key` - The key reference to sign with
    /// * `digest` - The precomputed digest to sign
    ///
    /// # Errors
    /// Returns [`SigningError::DigestSigningError`] if the service rejects or
    /// fails the operation; no partial signature is ever returned.
    pub async fn sign_digest(
        &self,
        key: &KeyReference,
        digest: &DigestBytes,
    ) -> SigningResult<SignatureBytes> {
        let url = format!("{}/api/v1/sign", self.config.base_url);
        let request = SignDigestRequest::new(key, digest);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.auth_token.as_str()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                SigningError::DigestSigningError(format!(
                    "Failed to reach custody service: {e}"
                ))
            })?;

        let sign_response: SignDigestResponse = self.handle_response(response).await?;

        let signature = sign_response.decode_signature().map_err(|e| {
            SigningError::DigestSigningError(format!("Failed to decode signature: {e}"))
        })?;
        if signature.is_empty() {
            return Err(SigningError::DigestSigningError(
                "Custody service returned an empty signature".to_string(),
            ));
        }
        Ok(SignatureBytes::new(signature))
    }

    /// Handle HTTP response and parse the JSON body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> SigningResult<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| SigningError::NetworkError(format!("Failed to parse response: {e}")))
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                Err(Self::map_error_code(&error_response))
            } else {
                Err(SigningError::NetworkError(format!(
                    "Custody service error {status}: {error_text}"
                )))
            }
        }
    }

    /// Map custody error codes to appropriate `SigningError` variants.
    fn map_error_code(error: &ErrorResponse) -> SigningError {
        match error.error_code.as_str() {
            error_codes::AUTH_FAILED => SigningError::DigestSigningError(format!(
                "Authentication failed: {}",
                error.message
            )),
            error_codes::KEY_NOT_FOUND => {
                SigningError::ConfigurationError(format!("Key not found: {}", error.message))
            }
            error_codes::UNSUPPORTED_ALGORITHM => SigningError::ValidationError(format!(
                "Unsupported algorithm: {}",
                error.message
            )),
            error_codes::SIGNING_FAILED => {
                SigningError::DigestSigningError(format!("Signing failed: {}", error.message))
            }
            error_codes::CERT_NOT_FOUND => {
                SigningError::CertificateError(format!("Certificate not found: {}", error.message))
            }
            error_codes::RATE_LIMITED => {
                SigningError::NetworkError(format!("Rate limited: {}", error.message))
            }
            _ => SigningError::NetworkError(format!(
                "Custody service error [{}]: {}",
                error.error_code, error.message
            )),
        }
    }
}
