//! In-memory storage implementation.
//!
//! Backs tests and single-node deployments. Conflict detection works the
//! same way as in the persistent backend: every board carries a version
//! that each committed write bumps, and a commit whose token is stale is
//! rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::Mutex;

use stat_ladder_core::UserId;

use crate::error::Result;
use crate::{CommitOutcome, ScoreEntry, ScoreStore, WatchToken};

/// In-memory `ScoreStore` implementation.
pub struct MemoryScoreStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    boards: HashMap<String, Board>,
    sets: HashMap<String, BTreeSet<String>>,
}

#[derive(Default)]
struct Board {
    scores: BTreeMap<UserId, f64>,
    version: u64,
}

impl Board {
    /// Members ordered by score descending, ties lexicographic by user id.
    fn ranked(&self) -> Vec<ScoreEntry> {
        let mut entries: Vec<ScoreEntry> = self
            .scores
            .iter()
            .map(|(user_id, score)| ScoreEntry {
                user_id: user_id.clone(),
                score: *score,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries
    }
}

impl MemoryScoreStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn watch(&self, board_key: &str) -> Result<WatchToken> {
        let inner = self.inner.lock();
        let version = inner.boards.get(board_key).map_or(0, |b| b.version);
        Ok(WatchToken(version))
    }

    fn member_score(&self, board_key: &str, member: &UserId) -> Result<Option<f64>> {
        let inner = self.inner.lock();
        Ok(inner
            .boards
            .get(board_key)
            .and_then(|b| b.scores.get(member).copied()))
    }

    fn top_members(&self, board_key: &str, limit: usize) -> Result<Vec<ScoreEntry>> {
        let inner = self.inner.lock();
        let mut entries = inner.boards.get(board_key).map_or_else(Vec::new, Board::ranked);
        entries.truncate(limit);
        Ok(entries)
    }

    fn member_rank(&self, board_key: &str, member: &UserId) -> Result<Option<usize>> {
        let inner = self.inner.lock();
        Ok(inner
            .boards
            .get(board_key)
            .and_then(|b| b.ranked().iter().position(|e| &e.user_id == member)))
    }

    fn commit_scores(
        &self,
        board_key: &str,
        token: WatchToken,
        writes: &[(UserId, f64)],
    ) -> Result<CommitOutcome> {
        let mut inner = self.inner.lock();
        let board = inner.boards.entry(board_key.to_owned()).or_default();
        if board.version != token.0 {
            return Ok(CommitOutcome::Conflict);
        }
        for (member, score) in writes {
            board.scores.insert(member.clone(), *score);
        }
        board.version += 1;
        Ok(CommitOutcome::Committed)
    }

    fn remove_from_boards(&self, board_keys: &[String], member: &UserId) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        let mut removed = Vec::new();
        for board_key in board_keys {
            if let Some(board) = inner.boards.get_mut(board_key) {
                if board.scores.remove(member).is_some() {
                    board.version += 1;
                    removed.push(board_key.clone());
                }
            }
        }
        Ok(removed)
    }

    fn add_set_member(&self, set_key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        Ok(inner
            .sets
            .entry(set_key.to_owned())
            .or_default()
            .insert(member.to_owned()))
    }

    fn set_members(&self, set_key: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        Ok(inner
            .sets
            .get(set_key)
            .map_or_else(Vec::new, |s| s.iter().cloned().collect()))
    }

    fn delete_key(&self, set_key: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        Ok(inner.sets.remove(set_key).is_some())
    }
}
