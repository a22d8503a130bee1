//! Error types for the log proxy.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::sidecar::error::ContainerError;

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error surfaced to the host for the event being handled.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error("Invalid promtail config document: {0}")]
    Document(#[from] serde_yml::Error),

    #[error("Promtail config at {} is not valid UTF-8", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("Failed to encode stored state: {0}")]
    State(#[from] serde_json::Error),
}

/// Settings resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Environment variable {key} is not valid unicode")]
    NotUnicode { key: String },
}

/// Errors raised while fetching and installing the promtail binary.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The downloaded archive does not hash to the pinned digest.
    #[error("Promtail binary sha256sum mismatch for {url}: expected {expected}, got {actual}")]
    DigestMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Failed to extract {}: {reason}", archive.display())]
    Extract { archive: PathBuf, reason: String },

    #[error("Archive {} does not contain '{name}'", archive.display())]
    MissingExecutable { archive: PathBuf, name: String },

    #[error("Install path {} has no file name", path.display())]
    InvalidInstallPath { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Malformed relation payloads.
#[derive(Debug, Error)]
pub enum RelationError {
    #[error("Relation data from {unit} is not a valid payload: {reason}")]
    InvalidPayload { unit: String, reason: String },

    #[error("Failed to write relation data key '{key}': {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Failed to encode relation payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Consumer registry lookups.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// A departure arrived for a unit that never announced an endpoint.
    #[error("No endpoint recorded for consumer '{0}'")]
    UnknownConsumer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_mismatch_message_names_both_digests() {
        let err = ProvisionError::DigestMismatch {
            url: "https://example.com/promtail.zip".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected aa"));
        assert!(msg.contains("got bb"));
    }

    #[test]
    fn test_payload_encode_failure_is_a_relation_error() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err: Error = RelationError::Encode(source).into();
        assert!(matches!(err, Error::Relation(RelationError::Encode(_))));
        assert!(err.to_string().starts_with("Failed to encode relation payload"));
    }

    #[test]
    fn test_membership_error_converts_into_error() {
        let err: Error = MembershipError::UnknownConsumer("agent/0".to_string()).into();
        assert!(matches!(
            err,
            Error::Membership(MembershipError::UnknownConsumer(ref unit)) if unit == "agent/0"
        ));
    }
}
