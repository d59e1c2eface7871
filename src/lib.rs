//! custody-signer
//!
//! Authenticode code signing with the private-key operation delegated to a
//! remote key-custody service. The crate builds the certificate chain from a
//! leaf plus helper certificates, assembles the platform signing request
//! (digest algorithm, description metadata, page hashing, timestamp policy),
//! and answers the platform's synchronous digest-signing callback by blocking
//! on the custody service — the file itself never leaves the machine, only
//! digests do.
//!
//! Entry point: [`AuthenticodeCustodySigner`]. Construct it with a
//! [`SigningConfiguration`], a [`TimestampConfiguration`], the helper
//! certificate pool, a [`DigestSigner`] (normally [`RemoteDigestSigner`]),
//! and a [`SigningSubsystem`] (the platform's own on Windows), then call
//! `sign_file` once per file.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::custody::{CustodyClient, CustodyClientConfig, DigestSigner, RemoteDigestSigner};
pub use adapters::platform::{DigestSignInput, SigningSubsystem};
pub use domain::crypto::{
    CertificateChain, DigestBytes, HashAlgorithm, MemoryCertificateStore, SignatureBytes,
};
pub use domain::types::{AuthToken, KeyReference, TimestampUrl};
pub use infra::config::{ConfigManager, SigningProfile};
pub use infra::error::{SigningError, SigningResult};
pub use services::chain_builder::{ChainBuildOptions, ChainBuilder};
pub use services::request_assembler::{PageHashing, RequestAssembler, SigningRequest};
pub use services::signing::{
    AuthenticodeCustodySigner, SigningConfiguration, TimestampConfiguration,
};
