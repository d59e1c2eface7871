//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - The remote key-custody service (wire protocol, async client, and the
//!   blocking digest-signer seam the callback boundary requires)
//! - The platform signing subsystem (`SignerSignEx3` on Windows)

pub mod custody;
pub mod platform;
