//! Common test utilities for stat-ladder-engine integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stat_ladder_core::{PolicyRegistry, UserId, WinLossPolicy};
use stat_ladder_engine::LeaderboardEngine;
use stat_ladder_store::{
    CommitOutcome, MemoryScoreStore, Result, ScoreEntry, ScoreStore, WatchToken,
};

/// Build an engine over a fresh in-memory store with the default policy
/// registered under `"default"`.
pub fn engine() -> LeaderboardEngine {
    engine_with_store(Arc::new(MemoryScoreStore::new()))
}

/// Build an engine over the given store with the default policy registered.
pub fn engine_with_store(store: Arc<dyn ScoreStore>) -> LeaderboardEngine {
    let mut registry = PolicyRegistry::new();
    registry.register_default(Arc::new(WinLossPolicy));
    LeaderboardEngine::new(store, registry)
}

/// Store wrapper that reports a write conflict for the first `n` commits,
/// then delegates. Stands in for concurrent writers racing the engine.
pub struct ConflictingStore {
    inner: MemoryScoreStore,
    remaining: AtomicUsize,
}

impl ConflictingStore {
    pub fn new(conflicts: usize) -> Self {
        Self {
            inner: MemoryScoreStore::new(),
            remaining: AtomicUsize::new(conflicts),
        }
    }
}

impl ScoreStore for ConflictingStore {
    fn watch(&self, board_key: &str) -> Result<WatchToken> {
        self.inner.watch(board_key)
    }

    fn member_score(&self, board_key: &str, member: &UserId) -> Result<Option<f64>> {
        self.inner.member_score(board_key, member)
    }

    fn top_members(&self, board_key: &str, limit: usize) -> Result<Vec<ScoreEntry>> {
        self.inner.top_members(board_key, limit)
    }

    fn member_rank(&self, board_key: &str, member: &UserId) -> Result<Option<usize>> {
        self.inner.member_rank(board_key, member)
    }

    fn commit_scores(
        &self,
        board_key: &str,
        token: WatchToken,
        writes: &[(UserId, f64)],
    ) -> Result<CommitOutcome> {
        let conflicted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Ok(CommitOutcome::Conflict);
        }
        self.inner.commit_scores(board_key, token, writes)
    }

    fn remove_from_boards(&self, board_keys: &[String], member: &UserId) -> Result<Vec<String>> {
        self.inner.remove_from_boards(board_keys, member)
    }

    fn add_set_member(&self, set_key: &str, member: &str) -> Result<bool> {
        self.inner.add_set_member(set_key, member)
    }

    fn set_members(&self, set_key: &str) -> Result<Vec<String>> {
        self.inner.set_members(set_key)
    }

    fn delete_key(&self, set_key: &str) -> Result<bool> {
        self.inner.delete_key(set_key)
    }
}
