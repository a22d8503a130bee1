//! Promtail binary provisioning.
//!
//! Credential-free: the archive URL comes from the provider over the
//! relation, the digest is pinned locally. An archive that fails the digest
//! check is never unpacked or installed.

pub mod artifact;
pub mod installer;

pub use artifact::{DOWNLOAD_CHUNK_SIZE, ProxyBinary, extract_zip, file_sha256, verify_sha256};
pub use installer::{BinaryProvisioner, ProvisionOutcome};
