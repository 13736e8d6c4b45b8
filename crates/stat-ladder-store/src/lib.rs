//! Storage layer for stat-ladder.
//!
//! This crate defines the contract over the ordered key-value backend that
//! holds the leaderboards, plus two implementations:
//!
//! - [`MemoryScoreStore`]: in-process backend used by tests and single-node
//!   deployments.
//! - [`RocksScoreStore`]: persistent `RocksDB` backend (behind the
//!   `rocksdb-backend` feature, on by default).
//!
//! # Data layout
//!
//! Two kinds of keys exist in the store:
//!
//! - Ranked sets (`_lb:{sub_key}:{product_id}`): member → score, ordered by
//!   score descending with lexicographic member-id tiebreak.
//! - Plain sets (`_lb:{user_id}:leaderboard_set`): the leaderboard keys a
//!   user currently appears in.
//!
//! # Concurrency
//!
//! The store is the sole coordination point between concurrent writers,
//! which may live in separate processes. Coordination is optimistic: a
//! writer takes a [`WatchToken`] snapshot of a board's version, reads and
//! computes, then calls [`ScoreStore::commit_scores`], which applies the
//! writes only if the board is still at the watched version. A lost race
//! surfaces as [`CommitOutcome::Conflict`] rather than an error, and the
//! caller decides whether to retry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryScoreStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksScoreStore;

use serde::{Deserialize, Serialize};

use stat_ladder_core::UserId;

/// One member of a ranked set, with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// The member's user identifier.
    pub user_id: UserId,
    /// The member's current score.
    pub score: f64,
}

/// Snapshot of a board's version, taken by [`ScoreStore::watch`].
///
/// Opaque to callers; a commit conditioned on a token succeeds only if no
/// other writer has modified the board since the token was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchToken(pub(crate) u64);

/// Result of a conditional commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The writes were applied atomically.
    Committed,
    /// Another writer modified the board first; nothing was written.
    Conflict,
}

/// The storage trait defining all backend operations.
///
/// Implementations must be safe to share across threads; all coordination
/// between writers goes through the watch/commit pair.
pub trait ScoreStore: Send + Sync {
    // =========================================================================
    // Ranked-Set Operations
    // =========================================================================

    /// Take a version snapshot of a board for a later conditional commit.
    ///
    /// Watching a board that does not exist yet is valid; the first commit
    /// creates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn watch(&self, board_key: &str) -> Result<WatchToken>;

    /// Get a member's score, or `None` if the member has no entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn member_score(&self, board_key: &str, member: &UserId) -> Result<Option<f64>>;

    /// List up to `limit` members ordered by score descending.
    ///
    /// Ties are broken lexicographically by user identifier so results are
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn top_members(&self, board_key: &str, limit: usize) -> Result<Vec<ScoreEntry>>;

    /// Get a member's 0-based position under the same ordering as
    /// [`ScoreStore::top_members`], or `None` if the member has no entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn member_rank(&self, board_key: &str, member: &UserId) -> Result<Option<usize>>;

    /// Atomically write member scores, conditioned on the watched version.
    ///
    /// Either every write in `writes` is applied and the board's version is
    /// bumped, or (on conflict) nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails; a lost race is
    /// reported as [`CommitOutcome::Conflict`], not an error.
    fn commit_scores(
        &self,
        board_key: &str,
        token: WatchToken,
        writes: &[(UserId, f64)],
    ) -> Result<CommitOutcome>;

    /// Remove a member from each of the given boards in one atomic batch.
    ///
    /// Returns the board keys from which the member was actually removed;
    /// boards without an entry for the member are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails; no removals are
    /// applied in that case.
    fn remove_from_boards(&self, board_keys: &[String], member: &UserId) -> Result<Vec<String>>;

    // =========================================================================
    // Plain-Set Operations
    // =========================================================================

    /// Add a member to a plain set. Idempotent.
    ///
    /// Returns `true` if the member was newly added.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn add_set_member(&self, set_key: &str, member: &str) -> Result<bool>;

    /// List all members of a plain set. Empty if the set does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn set_members(&self, set_key: &str) -> Result<Vec<String>>;

    /// Delete a plain set wholesale.
    ///
    /// Returns `true` if the set existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn delete_key(&self, set_key: &str) -> Result<bool>;
}
