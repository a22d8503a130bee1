//! Error types for sidecar container access.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for sidecar operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Errors that can occur while talking to the sidecar container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No container was configured and the unit does not have exactly one.
    #[error("Container cannot be obtained: {reason}")]
    Resolution {
        /// Why resolution failed.
        reason: String,
    },

    /// A file was requested that does not exist in the container.
    #[error("File not found in container: {}", path.display())]
    NotFound {
        /// Path inside the container.
        path: PathBuf,
    },

    /// The process supervision API rejected a request.
    #[error("Container API call '{operation}' failed: {reason}")]
    Api {
        /// Operation that failed (push, restart, ...).
        operation: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// The container backend does not implement this operation.
    #[error("Operation '{operation}' is not supported by this container")]
    Unsupported {
        /// Operation name.
        operation: &'static str,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
