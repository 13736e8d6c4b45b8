//! Error types for stat-ladder.

/// Result type for stat-ladder operations.
pub type Result<T> = std::result::Result<T, LadderError>;

/// Errors that can occur in leaderboard operations.
#[derive(Debug, thiserror::Error)]
pub enum LadderError {
    /// No score policy resolves for the given product, not even the default.
    #[error("invalid product id: {product_id}")]
    InvalidProductId {
        /// The product ID that failed to resolve.
        product_id: String,
    },

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}
