//! User removal integration tests.

mod common;

use std::sync::Arc;

use common::{engine, engine_with_store};
use stat_ladder_core::{LadderError, ProductId, UserId};
use stat_ladder_store::{
    CommitOutcome, MemoryScoreStore, Result, ScoreEntry, ScoreStore, StoreError, WatchToken,
};

fn product(id: &str) -> ProductId {
    ProductId::new(id)
}

fn user(id: &str) -> UserId {
    UserId::new(id)
}

// ============================================================================
// Removal outcomes
// ============================================================================

#[test]
fn remove_user_with_no_memberships_is_empty_not_error() {
    let engine = engine();
    let removed = engine.remove_user(&user("some_user_id")).unwrap();
    assert!(removed.is_empty());
}

#[test]
fn remove_user_returns_affected_leaderboards() {
    let engine = engine();
    engine
        .record_result(&product("game_a"), &user("target"), &user("other"))
        .unwrap();
    engine
        .record_result(&product("game_b"), &user("other"), &user("target"))
        .unwrap();

    let mut removed = engine.remove_user(&user("target")).unwrap();
    removed.sort();
    assert_eq!(removed, vec!["_lb:wins:game_a", "_lb:wins:game_b"]);

    // The other player is untouched.
    assert_eq!(
        engine.user_score(&product("game_a"), &user("other")).unwrap(),
        Some(0.0)
    );
    assert_eq!(
        engine.user_score(&product("game_a"), &user("target")).unwrap(),
        None
    );
}

#[test]
fn remove_user_is_idempotent() {
    let engine = engine();
    engine
        .record_result(&product("exrps"), &user("target"), &user("other"))
        .unwrap();

    let first = engine.remove_user(&user("target")).unwrap();
    assert_eq!(first, vec!["_lb:wins:exrps"]);

    // The index was cleared wholesale, so a repeat finds nothing.
    let second = engine.remove_user(&user("target")).unwrap();
    assert!(second.is_empty());
}

#[test]
fn remove_user_clears_stale_index_entries() {
    let engine = engine();
    // Index the user on a board they never scored on.
    engine.add_user_board(&user("target"), "_lb:wins:ghost_game");

    let removed = engine.remove_user(&user("target")).unwrap();
    // No-op removals are not reported as removed...
    assert!(removed.is_empty());
    // ...but the index is still cleared.
    assert!(engine.user_boards(&user("target")).unwrap().is_empty());
}

// ============================================================================
// Storage failure is distinct from not-found
// ============================================================================

/// Store whose plain-set reads fail, simulating a lost backend.
struct BrokenIndexStore {
    inner: MemoryScoreStore,
}

impl ScoreStore for BrokenIndexStore {
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
        self.inner.commit_scores(board_key, token, writes)
    }

    fn remove_from_boards(&self, board_keys: &[String], member: &UserId) -> Result<Vec<String>> {
        self.inner.remove_from_boards(board_keys, member)
    }

    fn add_set_member(&self, set_key: &str, member: &str) -> Result<bool> {
        self.inner.add_set_member(set_key, member)
    }

    fn set_members(&self, _set_key: &str) -> Result<Vec<String>> {
        Err(StoreError::Database("connection refused".into()))
    }

    fn delete_key(&self, set_key: &str) -> Result<bool> {
        self.inner.delete_key(set_key)
    }
}

#[test]
fn remove_user_surfaces_storage_errors() {
    let engine = engine_with_store(Arc::new(BrokenIndexStore {
        inner: MemoryScoreStore::new(),
    }));

    let result = engine.remove_user(&user("target"));
    assert!(matches!(result, Err(LadderError::Storage(_))));
}
