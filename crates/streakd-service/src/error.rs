//! Service error types.

use thiserror::Error;

/// Errors surfaced to the chat frontend.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Underlying storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] streakd_storage::StorageError),

    /// Rejected trigger word (too short, empty).
    #[error("Invalid trigger word: {0}")]
    InvalidWord(String),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
