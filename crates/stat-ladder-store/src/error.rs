//! Error types for stat-ladder storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Write conflicts are not errors; they are reported through
/// [`crate::CommitOutcome::Conflict`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A key or member contains bytes the backend cannot encode.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
