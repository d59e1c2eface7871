//! custody-signer CLI
//!
//! Command-line interface for Authenticode signing against a remote
//! key-custody service.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use custody_signer::{
    AuthenticodeCustodySigner, AuthToken, ConfigManager, CustodyClient, CustodyClientConfig,
    HashAlgorithm, KeyReference, PageHashing, RemoteDigestSigner, SigningConfiguration,
    SigningError, SigningProfile, SigningResult, TimestampConfiguration, TimestampUrl,
};

use der::{Decode, DecodePem};
use x509_cert::Certificate;

#[derive(Parser)]
#[command(name = "custody-signer")]
#[command(about = "Authenticode code signing with a remote key-custody service")]
#[command(long_about = "
custody-signer - Authenticode signing without a local private key

The private key never leaves the custody service; only file digests are sent
over the wire. The signed file is produced in place by the platform signing
subsystem.

EXAMPLES:
    # Sign with an RFC 3161 timestamp, fetching the certificate from custody
    custody-signer sign myapp.exe -u https://custody.example.com -k codesign \\
        -t http://timestamp.digicert.com

    # Sign with a local copy of the certificate chain
    custody-signer sign installer.msi -u https://custody.example.com -k codesign \\
        -c leaf.pem -a intermediates.pem --timestamp none

    # Check the custody service
    custody-signer status -u https://custody.example.com

ENVIRONMENT VARIABLES:
    CUSTODY_AUTH_TOKEN   Bearer token for the custody service (required)
    RUST_LOG             Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a file
    Sign {
        /// File to sign (.exe, .dll, .sys, .msi, ...)
        file: PathBuf,

        /// Custody service base URL (falls back to the saved profile)
        #[arg(short = 'u', long)]
        custody_url: Option<String>,

        /// Custody key reference to sign with (falls back to the saved profile)
        #[arg(short = 'k', long)]
        key_id: Option<String>,

        /// Leaf certificate file (PEM or DER); fetched from the custody
        /// service when omitted
        #[arg(short = 'c', long)]
        certificate: Option<PathBuf>,

        /// Additional certificate files (PEM or DER) used to resolve
        /// intermediates; may be repeated
        #[arg(short = 'a', long = "additional-certs")]
        additional_certs: Vec<PathBuf>,

        /// Signature description (shown as the program name)
        #[arg(short = 'd', long)]
        description: Option<String>,

        /// URL with more information about the signed content
        #[arg(long)]
        description_url: Option<String>,

        /// Page hashing mode
        #[arg(long, value_enum, default_value_t = PageHashingArg::Default)]
        page_hashing: PageHashingArg,

        /// Timestamp mode
        #[arg(long, value_enum, default_value_t = TimestampModeArg::Rfc3161)]
        timestamp: TimestampModeArg,

        /// Timestamp authority URL (required unless --timestamp none)
        #[arg(short = 't', long)]
        timestamp_url: Option<String>,

        /// Digest algorithm for RFC 3161 timestamp requests
        #[arg(long, default_value = "sha256")]
        timestamp_digest: String,

        /// File digest algorithm
        #[arg(long, default_value = "sha256")]
        file_digest: String,

        /// Custody request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip TLS verification for the custody service (testing only)
        #[arg(long)]
        insecure_tls: bool,
    },

    /// Check custody service status
    Status {
        /// Custody service base URL (falls back to the saved profile)
        #[arg(short = 'u', long)]
        custody_url: Option<String>,

        /// Custody request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip TLS verification for the custody service (testing only)
        #[arg(long)]
        insecure_tls: bool,
    },

    /// Manage the saved profile
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default profile
    Init,
    /// Print the saved profile
    Show,
}

#[derive(Clone, Copy, ValueEnum)]
enum PageHashingArg {
    Include,
    Exclude,
    Default,
}

impl From<PageHashingArg> for PageHashing {
    fn from(value: PageHashingArg) -> Self {
        match value {
            PageHashingArg::Include => PageHashing::Include,
            PageHashingArg::Exclude => PageHashing::Exclude,
            PageHashingArg::Default => PageHashing::PlatformDefault,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TimestampModeArg {
    None,
    Authenticode,
    Rfc3161,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sign {
            file,
            custody_url,
            key_id,
            certificate,
            additional_certs,
            description,
            description_url,
            page_hashing,
            timestamp,
            timestamp_url,
            timestamp_digest,
            file_digest,
            timeout,
            insecure_tls,
        } => {
            let profile = load_profile();
            let custody_url = resolve(custody_url, profile.as_ref().map(|p| &p.custody_url))?;
            let key_id = resolve(key_id, profile.as_ref().map(|p| &p.key_id))?;
            let key = KeyReference::new(key_id)?;

            let custody_config =
                client_config(&custody_url, timeout, insecure_tls, profile.as_ref())?;

            let timestamp_configuration = match timestamp {
                TimestampModeArg::None => TimestampConfiguration::None,
                TimestampModeArg::Authenticode => TimestampConfiguration::Authenticode {
                    url: require_timestamp_url(timestamp_url, profile.as_ref())?,
                },
                TimestampModeArg::Rfc3161 => TimestampConfiguration::Rfc3161 {
                    url: require_timestamp_url(timestamp_url, profile.as_ref())?,
                    digest_algorithm: timestamp_digest.parse::<HashAlgorithm>()?,
                },
            };

            let leaf_der = match certificate {
                Some(path) => load_certificate_der(&path)?,
                None => fetch_certificate(custody_config.clone(), &key)?,
            };
            let additional = load_additional_certificates(&additional_certs)?;

            let configuration = SigningConfiguration::new(
                leaf_der,
                file_digest.parse::<HashAlgorithm>()?,
                key.clone(),
            )?;
            let digest_signer = RemoteDigestSigner::new(custody_config, key)?;

            let signer = AuthenticodeCustodySigner::with_platform_subsystem(
                configuration,
                timestamp_configuration,
                &additional,
                Box::new(digest_signer),
            )?;

            signer.sign_file(
                &file,
                description.as_deref(),
                description_url.as_deref(),
                page_hashing.into(),
            )?;
            println!("Signed {}", file.display());
            Ok(())
        }

        Commands::Status {
            custody_url,
            timeout,
            insecure_tls,
        } => {
            let profile = load_profile();
            let custody_url = resolve(custody_url, profile.as_ref().map(|p| &p.custody_url))?;
            let config = client_config(&custody_url, timeout, insecure_tls, profile.as_ref())?;

            let client = CustodyClient::new(config)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .into_diagnostic()?;
            let status = runtime.block_on(client.check_status())?;

            println!("Custody service at {custody_url}");
            println!("  ready:   {}", status.ready);
            println!("  uptime:  {}s", status.uptime_seconds);
            println!("  keys:    {}", status.available_keys.join(", "));
            Ok(())
        }

        Commands::Config { action } => {
            let manager = ConfigManager::new()?;
            match action {
                ConfigAction::Init => {
                    manager.save(&SigningProfile::default())?;
                    println!("Wrote {}", manager.config_path().display());
                }
                ConfigAction::Show => {
                    let profile = manager.load()?;
                    print!("{}", toml::to_string_pretty(&profile).into_diagnostic()?);
                }
            }
            Ok(())
        }
    }
}

fn load_profile() -> Option<SigningProfile> {
    let manager = ConfigManager::new().ok()?;
    manager.load().ok()
}

fn resolve(flag: Option<String>, saved: Option<&String>) -> SigningResult<String> {
    match flag {
        Some(value) => Ok(value),
        None => match saved {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(SigningError::ConfigurationError(
                "Missing custody service coordinates: pass --custody-url/--key-id or save a profile"
                    .to_string(),
            )),
        },
    }
}

fn client_config(
    custody_url: &str,
    timeout: Option<u64>,
    insecure_tls: bool,
    profile: Option<&SigningProfile>,
) -> SigningResult<CustodyClientConfig> {
    let token = std::env::var("CUSTODY_AUTH_TOKEN").map_err(|_| {
        SigningError::ConfigurationError(
            "CUSTODY_AUTH_TOKEN environment variable not set".to_string(),
        )
    })?;
    let mut config = CustodyClientConfig::new(custody_url, AuthToken::new(token)?);
    if let Some(secs) = timeout.or(profile.map(|p| p.network_timeout_seconds)) {
        config = config.with_timeout(secs);
    }
    if insecure_tls || profile.is_some_and(|p| !p.verify_tls) {
        config = config.with_insecure_tls();
    }
    Ok(config)
}

fn require_timestamp_url(
    flag: Option<String>,
    profile: Option<&SigningProfile>,
) -> SigningResult<TimestampUrl> {
    let url = flag.or_else(|| profile.and_then(|p| p.timestamp_url.clone()));
    match url {
        Some(url) => TimestampUrl::new(url),
        None => Err(SigningError::ConfigurationError(
            "A timestamp URL is required unless --timestamp none".to_string(),
        )),
    }
}

fn fetch_certificate(config: CustodyClientConfig, key: &KeyReference) -> SigningResult<Vec<u8>> {
    log::info!("Fetching signing certificate from custody service");
    let client = CustodyClient::new(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SigningError::ConfigurationError(format!("Failed to create runtime: {e}")))?;
    runtime.block_on(client.get_certificate(key))
}

fn load_certificate_der(path: &Path) -> SigningResult<Vec<u8>> {
    let bytes = std::fs::read(path)
        .map_err(|e| SigningError::IoError(format!("Failed to read {}: {e}", path.display())))?;
    if looks_like_pem(&bytes) {
        let certificate = Certificate::from_pem(&bytes).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        use der::Encode;
        certificate.to_der().map_err(|e| {
            SigningError::CertificateError(format!("Failed to encode {}: {e}", path.display()))
        })
    } else {
        // Validate eagerly so the error names the file, not the chain build.
        Certificate::from_der(&bytes).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(bytes)
    }
}

fn load_additional_certificates(paths: &[PathBuf]) -> SigningResult<Vec<Certificate>> {
    let mut certificates = Vec::new();
    for path in paths {
        let bytes = std::fs::read(path).map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", path.display()))
        })?;
        if looks_like_pem(&bytes) {
            let chain = Certificate::load_pem_chain(&bytes).map_err(|e| {
                SigningError::CertificateError(format!("Failed to parse {}: {e}", path.display()))
            })?;
            certificates.extend(chain);
        } else {
            let certificate = Certificate::from_der(&bytes).map_err(|e| {
                SigningError::CertificateError(format!("Failed to parse {}: {e}", path.display()))
            })?;
            certificates.push(certificate);
        }
    }
    Ok(certificates)
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    bytes.starts_with(b"-----BEGIN") || bytes.starts_with(b"\n-----BEGIN")
}
