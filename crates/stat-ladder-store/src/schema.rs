//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Ranked-set entries, keyed by `board_key \0 member`. Value is the
    /// CBOR-encoded score.
    pub const SCORES: &str = "scores";

    /// Plain-set entries, keyed by `set_key \0 member`. Value is empty
    /// (membership only).
    pub const SETS: &str = "sets";

    /// Board versions for optimistic concurrency, keyed by `board_key`.
    /// Value is a little-endian `u64`.
    pub const VERSIONS: &str = "versions";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::SCORES, cf::SETS, cf::VERSIONS]
}
