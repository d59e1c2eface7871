//! Type-safe wrappers using the new-type pattern
//!
//! This module provides type-safe wrappers for various inputs to prevent
//! common errors and improve API safety.

use std::fmt;
use std::str::FromStr;

use zeroize::Zeroize;

use crate::infra::error::{SigningError, SigningResult};

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampUrl(String);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    pub fn new(url: impl AsRef<str>) -> SigningResult<Self> {
        let url = url.as_ref();
        Self::validate_url(url)?;
        Ok(TimestampUrl(url.to_string()))
    }

    /// Get the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that the URL is reasonable for timestamping
    fn validate_url(url: &str) -> SigningResult<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL must start with http:// or https://, got: {url}"
            )));
        }

        if url.len() <= 8 {
            return Err(SigningError::ValidationError(
                "Timestamp URL too short".to_string(),
            ));
        }

        let without_protocol = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap();
        if !without_protocol.contains('.') {
            return Err(SigningError::ValidationError(format!(
                "Timestamp URL must contain a valid domain: {url}"
            )));
        }

        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for the identifier of a key held by the custody service.
///
/// The reference is opaque to this crate; the custody service resolves it to
/// actual key material. Typical values are key names or versioned key URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReference(String);

impl KeyReference {
    /// Create a new `KeyReference` after validation
    pub fn new(reference: impl AsRef<str>) -> SigningResult<Self> {
        let reference = reference.as_ref();
        if reference.trim().is_empty() {
            return Err(SigningError::ValidationError(
                "Key reference must not be empty".to_string(),
            ));
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(SigningError::ValidationError(format!(
                "Key reference must not contain whitespace: {reference:?}"
            )));
        }
        Ok(KeyReference(reference.to_string()))
    }

    /// Get the reference as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for KeyReference {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for KeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bearer token for authenticating against the custody service.
///
/// The token is zeroized on drop and never printed.
#[derive(Clone)]
pub struct AuthToken(String);

impl AuthToken {
    /// Create a new `AuthToken` after validation
    pub fn new(token: impl AsRef<str>) -> SigningResult<Self> {
        let token = token.as_ref();
        if token.is_empty() {
            return Err(SigningError::ValidationError(
                "Auth token must not be empty".to_string(),
            ));
        }
        Ok(AuthToken(token.to_string()))
    }

    /// Get the token as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for AuthToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

// Never leak the token through Debug or Display.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken([REDACTED])")
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[TOKEN REDACTED]")
    }
}
