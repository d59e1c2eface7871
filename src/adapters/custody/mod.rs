//! Remote key-custody service integration.
//!
//! The custody service holds the private key; this crate only ever sends it
//! precomputed digests. `protocol` defines the JSON wire format, `client` the
//! async HTTP client, and `blocking` the synchronous seam the digest-signing
//! callback requires.

pub mod blocking;
pub mod client;
pub mod protocol;

pub use blocking::{DigestSigner, RemoteDigestSigner};
pub use client::{CustodyClient, CustodyClientConfig};
