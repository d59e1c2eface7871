//! Configuration profiles.
//!
//! Lets users save custody service coordinates and signing preferences to a
//! TOML file instead of repeating them on every invocation. The auth token is
//! deliberately not part of the profile; it comes from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infra::error::{SigningError, SigningResult};

/// Saved signing preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningProfile {
    /// Base URL of the custody service.
    pub custody_url: String,

    /// Default key reference to sign with.
    pub key_id: String,

    /// Default file digest algorithm ("sha256", "sha384", "sha512").
    pub digest_algorithm: String,

    /// Timestamp mode: "none", "authenticode", or "rfc3161".
    pub timestamp_mode: String,

    /// Timestamp authority URL.
    pub timestamp_url: Option<String>,

    /// Digest algorithm for RFC 3161 timestamp requests.
    pub timestamp_digest_algorithm: String,

    /// Page hashing mode: "include", "exclude", or "default".
    pub page_hashing: String,

    /// Network timeout for custody requests, in seconds.
    pub network_timeout_seconds: u64,

    /// Whether to verify the custody service's TLS certificate.
    pub verify_tls: bool,
}

impl Default for SigningProfile {
    fn default() -> Self {
        Self {
            custody_url: String::new(),
            key_id: String::new(),
            digest_algorithm: "sha256".to_string(),
            timestamp_mode: "rfc3161".to_string(),
            timestamp_url: Some("http://timestamp.digicert.com".to_string()),
            timestamp_digest_algorithm: "sha256".to_string(),
            page_hashing: "default".to_string(),
            network_timeout_seconds: 30,
            verify_tls: true,
        }
    }
}

/// Configuration manager for handling profile files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with the default path.
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with a custom path.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("custody-signer").join("config.toml"))
        } else {
            Err(SigningError::ConfigurationError(
                "Could not determine user configuration directory".to_string(),
            ))
        }
    }

    /// The path this manager reads and writes.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the profile from disk.
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed.
    pub fn load(&self) -> SigningResult<SigningProfile> {
        let contents = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read {}: {e}",
                self.config_path.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to parse {}: {e}",
                self.config_path.display()
            ))
        })
    }

    /// Save a profile to disk, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn save(&self, profile: &SigningProfile) -> SigningResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let contents = toml::to_string_pretty(profile).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize profile: {e}"))
        })?;
        fs::write(&self.config_path, contents).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write {}: {e}",
                self.config_path.display()
            ))
        })
    }

    /// Load the profile, writing the defaults first if none exists yet.
    pub fn load_or_create_default(&self) -> SigningResult<SigningProfile> {
        if self.config_path.exists() {
            self.load()
        } else {
            let profile = SigningProfile::default();
            self.save(&profile)?;
            Ok(profile)
        }
    }
}
