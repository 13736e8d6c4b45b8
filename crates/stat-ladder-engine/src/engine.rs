//! The leaderboard engine.

use std::sync::Arc;

use stat_ladder_core::{LadderError, PolicyRegistry, ProductId, Result, ScorePolicy, UserId};
use stat_ladder_store::{keys, CommitOutcome, ScoreEntry, ScoreStore, StoreError};

/// Number of optimistic write attempts before `record_result` gives up.
pub const DEFAULT_RETRY_BUDGET: usize = 10;

/// Default number of entries returned by top-player queries.
pub const DEFAULT_TOP_COUNT: usize = 10;

/// Orchestrates score recording, ranking queries, and user removal.
///
/// Holds no locks of its own: correctness under concurrent writers, across
/// service instances sharing one store, comes entirely from the store's
/// watch/commit primitive.
pub struct LeaderboardEngine {
    store: Arc<dyn ScoreStore>,
    registry: PolicyRegistry,
    retry_budget: usize,
}

impl LeaderboardEngine {
    /// Create an engine over the given store and policy registry.
    #[must_use]
    pub fn new(store: Arc<dyn ScoreStore>, registry: PolicyRegistry) -> Self {
        Self {
            store,
            registry,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    /// Override the optimistic-write retry budget.
    #[must_use]
    pub fn with_retry_budget(mut self, retry_budget: usize) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Resolve the score policy for a product, with default fallback.
    fn resolve_policy(&self, product_id: &ProductId) -> Result<Arc<dyn ScorePolicy>> {
        self.registry
            .resolve(product_id, true)
            .ok_or_else(|| LadderError::InvalidProductId {
                product_id: product_id.to_string(),
            })
    }

    /// Record a match result on the product's wins leaderboard.
    ///
    /// Reads both players' current scores, computes new ones via the
    /// product's policy, and writes them atomically under optimistic
    /// concurrency. Returns `Ok(true)` on success and `Ok(false)` once the
    /// retry budget is exhausted by write conflicts; non-conflict storage
    /// errors propagate as `Err`.
    ///
    /// # Errors
    ///
    /// - [`LadderError::InvalidProductId`] if no policy resolves for
    ///   `product_id`, not even the default.
    /// - [`LadderError::Storage`] if a store round trip fails.
    pub fn record_result(
        &self,
        product_id: &ProductId,
        winner_id: &UserId,
        loser_id: &UserId,
    ) -> Result<bool> {
        tracing::debug!(
            product_id = %product_id,
            winner_id = %winner_id,
            loser_id = %loser_id,
            "recording result"
        );

        let policy = self.resolve_policy(product_id)?;
        let board_key = keys::leaderboard_key(product_id, keys::WINS);

        // Every path that inserts a user into a board must also record the
        // board in that user's index set, or removal misses entries.
        for user_id in [winner_id, loser_id] {
            self.add_user_board(user_id, &board_key);
        }

        for attempt in 0..self.retry_budget {
            let token = self.store.watch(&board_key).map_err(storage_err)?;
            let winner_score = self
                .store
                .member_score(&board_key, winner_id)
                .map_err(storage_err)?;
            let loser_score = self
                .store
                .member_score(&board_key, loser_id)
                .map_err(storage_err)?;

            let (winner_new, loser_new) =
                policy.compute(winner_id, winner_score, loser_id, loser_score);

            tracing::info!(
                product_id = %product_id,
                winner_id = %winner_id,
                winner_new_score = winner_new,
                loser_id = %loser_id,
                loser_new_score = loser_new,
                "recording game result"
            );

            let outcome = self
                .store
                .commit_scores(
                    &board_key,
                    token,
                    &[(winner_id.clone(), winner_new), (loser_id.clone(), loser_new)],
                )
                .map_err(storage_err)?;

            match outcome {
                CommitOutcome::Committed => return Ok(true),
                CommitOutcome::Conflict => {
                    tracing::warn!(attempt, board_key = %board_key, "write conflict on leaderboard");
                }
            }
        }

        tracing::error!(
            board_key = %board_key,
            retry_budget = self.retry_budget,
            "failed to write leaderboard score: retry budget exhausted by write conflicts"
        );
        Ok(false)
    }

    /// Fetch up to `count` top players for a product, best first.
    ///
    /// Entries are ordered by score descending, ties broken lexicographically
    /// by user id. Returns exactly `count` entries at most; the upstream
    /// service this replaces returned `count + 1` due to an inclusive range,
    /// which nothing relied on.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::InvalidProductId`] for an unknown product
    /// (regardless of store state) or [`LadderError::Storage`] if the store
    /// fails.
    pub fn top_players(&self, product_id: &ProductId, count: usize) -> Result<Vec<ScoreEntry>> {
        tracing::debug!(product_id = %product_id, count, "fetching top players");
        // Validates that the product is known; the policy itself is unused
        // on the read path.
        self.resolve_policy(product_id)?;

        let board_key = keys::leaderboard_key(product_id, keys::WINS);
        self.store.top_members(&board_key, count).map_err(storage_err)
    }

    /// Fetch a user's raw score on the product's wins leaderboard.
    ///
    /// `None` if the user has no entry. (The upstream service exposed this
    /// as "rank"; see [`LeaderboardEngine::user_rank`] for the ordinal.)
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::InvalidProductId`] for an unknown product or
    /// [`LadderError::Storage`] if the store fails.
    pub fn user_score(&self, product_id: &ProductId, user_id: &UserId) -> Result<Option<f64>> {
        tracing::debug!(product_id = %product_id, user_id = %user_id, "fetching user score");
        self.resolve_policy(product_id)?;

        let board_key = keys::leaderboard_key(product_id, keys::WINS);
        self.store
            .member_score(&board_key, user_id)
            .map_err(storage_err)
    }

    /// Fetch a user's 1-based ordinal rank on the product's wins leaderboard.
    ///
    /// `None` if the user has no entry.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::InvalidProductId`] for an unknown product or
    /// [`LadderError::Storage`] if the store fails.
    pub fn user_rank(&self, product_id: &ProductId, user_id: &UserId) -> Result<Option<usize>> {
        self.resolve_policy(product_id)?;

        let board_key = keys::leaderboard_key(product_id, keys::WINS);
        let rank = self
            .store
            .member_rank(&board_key, user_id)
            .map_err(storage_err)?;
        Ok(rank.map(|r| r + 1))
    }

    /// Record that a user appears on the given leaderboard.
    ///
    /// Idempotent. Bookkeeping failures are logged and swallowed so a flaky
    /// index write cannot fail score recording; the next result for the same
    /// pair repairs the index.
    pub fn add_user_board(&self, user_id: &UserId, board_key: &str) {
        let set_key = keys::user_boards_key(user_id);
        match self.store.add_set_member(&set_key, board_key) {
            Ok(true) => {
                tracing::info!(user_id = %user_id, board_key = %board_key, "added leaderboard to user record");
            }
            Ok(false) => {}
            Err(err) => {
                tracing::error!(
                    user_id = %user_id,
                    board_key = %board_key,
                    error = %err,
                    "error adding leaderboard to user record"
                );
            }
        }
    }

    /// List the leaderboard keys a user currently appears in.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Storage`] if the store fails.
    pub fn user_boards(&self, user_id: &UserId) -> Result<Vec<String>> {
        let set_key = keys::user_boards_key(user_id);
        self.store.set_members(&set_key).map_err(storage_err)
    }

    /// Remove a user from every leaderboard they appear in.
    ///
    /// Returns the keys of the leaderboards the user was actually removed
    /// from. `Ok(vec![])` means the user had no memberships, which is not an
    /// error; a storage failure at any step aborts and returns `Err`, so
    /// callers can tell "user had no leaderboards" apart from "the store
    /// failed". The user's membership index is deleted unconditionally, which
    /// makes a second call return `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Storage`] if the store fails.
    pub fn remove_user(&self, user_id: &UserId) -> Result<Vec<String>> {
        let result = self.remove_user_inner(user_id);
        if let Err(err) = &result {
            tracing::error!(user_id = %user_id, error = %err, "error removing user from leaderboards");
        }
        result
    }

    fn remove_user_inner(&self, user_id: &UserId) -> Result<Vec<String>> {
        let set_key = keys::user_boards_key(user_id);
        let board_keys = self.store.set_members(&set_key).map_err(storage_err)?;

        if board_keys.is_empty() {
            tracing::info!(user_id = %user_id, "user was not found in any leaderboard");
            return Ok(Vec::new());
        }

        let removed = self
            .store
            .remove_from_boards(&board_keys, user_id)
            .map_err(storage_err)?;

        for board_key in &board_keys {
            if removed.contains(board_key) {
                tracing::info!(user_id = %user_id, board_key = %board_key, "removed user from leaderboard");
            } else {
                tracing::info!(user_id = %user_id, board_key = %board_key, "user had no entry on leaderboard");
            }
        }

        // Unconditional: the index is cleared even if some removals were
        // no-ops, so it never points at boards the user is no longer on.
        self.store.delete_key(&set_key).map_err(storage_err)?;

        Ok(removed)
    }
}

fn storage_err(err: StoreError) -> LadderError {
    LadderError::Storage(err.to_string())
}
