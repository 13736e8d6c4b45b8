//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksScoreStore` implementation of the
//! [`ScoreStore`] trait. Ranked sets and plain sets live in separate column
//! families with `\0`-joined composite keys; board versions for optimistic
//! concurrency live in a third.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use stat_ladder_core::UserId;

use crate::error::{Result, StoreError};
use crate::schema::{all_column_families, cf};
use crate::{CommitOutcome, ScoreEntry, ScoreStore, WatchToken};

/// Composite-key separator. Key parts are checked for NUL bytes before
/// encoding so the separator cannot collide with key content.
const SEP: u8 = 0;

/// RocksDB-backed storage implementation.
///
/// `RocksDB` is a single-process store, so a process-local mutex around the
/// version check-and-write is enough to make commits atomic.
pub struct RocksScoreStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    commit_lock: Mutex<()>,
}

impl RocksScoreStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Reject key parts containing the separator byte. Identifiers come from
    /// external systems, so this cannot be assumed away.
    fn check_key_part(part: &str) -> Result<()> {
        if part.bytes().any(|b| b == SEP) {
            return Err(StoreError::InvalidKey(format!(
                "key part contains NUL byte: {part:?}"
            )));
        }
        Ok(())
    }

    /// Build a `namespace \0 member` composite key.
    fn composite_key(namespace: &str, member: &str) -> Result<Vec<u8>> {
        Self::check_key_part(namespace)?;
        Self::check_key_part(member)?;
        let mut key = Vec::with_capacity(namespace.len() + 1 + member.len());
        key.extend_from_slice(namespace.as_bytes());
        key.push(SEP);
        key.extend_from_slice(member.as_bytes());
        Ok(key)
    }

    /// Build the scan prefix for all members under a namespace.
    fn member_prefix(namespace: &str) -> Result<Vec<u8>> {
        Self::check_key_part(namespace)?;
        let mut prefix = Vec::with_capacity(namespace.len() + 1);
        prefix.extend_from_slice(namespace.as_bytes());
        prefix.push(SEP);
        Ok(prefix)
    }

    /// Serialize a score using CBOR.
    fn serialize_score(score: f64) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(&score, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a score from CBOR.
    fn deserialize_score(data: &[u8]) -> Result<f64> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read a board's current version (0 if the board has never been written).
    fn board_version(&self, board_key: &str) -> Result<u64> {
        let cf = self.cf(cf::VERSIONS)?;
        let data = self
            .db
            .get_cf(&cf, board_key.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match data {
            None => Ok(0),
            Some(bytes) => {
                let bytes: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Serialization("malformed board version".into()))?;
                Ok(u64::from_le_bytes(bytes))
            }
        }
    }

    /// Collect all `(member, value)` pairs under a namespace prefix.
    fn scan_members(&self, cf_name: &str, namespace: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let cf = self.cf(cf_name)?;
        let prefix = Self::member_prefix(namespace)?;

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut members = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let member = String::from_utf8(key[prefix.len()..].to_vec())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            members.push((member, value.to_vec()));
        }
        Ok(members)
    }

    /// All entries of a board, ordered by score descending with
    /// lexicographic member-id tiebreak.
    fn ranked_entries(&self, board_key: &str) -> Result<Vec<ScoreEntry>> {
        let mut entries = Vec::new();
        for (member, value) in self.scan_members(cf::SCORES, board_key)? {
            entries.push(ScoreEntry {
                user_id: UserId::new(member),
                score: Self::deserialize_score(&value)?,
            });
        }
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(entries)
    }
}

impl ScoreStore for RocksScoreStore {
    // =========================================================================
    // Ranked-Set Operations
    // =========================================================================

    fn watch(&self, board_key: &str) -> Result<WatchToken> {
        Ok(WatchToken(self.board_version(board_key)?))
    }

    fn member_score(&self, board_key: &str, member: &UserId) -> Result<Option<f64>> {
        let cf = self.cf(cf::SCORES)?;
        let key = Self::composite_key(board_key, member.as_str())?;

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize_score(&data))
            .transpose()
    }

    fn top_members(&self, board_key: &str, limit: usize) -> Result<Vec<ScoreEntry>> {
        let mut entries = self.ranked_entries(board_key)?;
        entries.truncate(limit);
        Ok(entries)
    }

    fn member_rank(&self, board_key: &str, member: &UserId) -> Result<Option<usize>> {
        let entries = self.ranked_entries(board_key)?;
        Ok(entries.iter().position(|e| &e.user_id == member))
    }

    fn commit_scores(
        &self,
        board_key: &str,
        token: WatchToken,
        writes: &[(UserId, f64)],
    ) -> Result<CommitOutcome> {
        let _guard = self.commit_lock.lock();

        if self.board_version(board_key)? != token.0 {
            return Ok(CommitOutcome::Conflict);
        }

        let cf_scores = self.cf(cf::SCORES)?;
        let cf_versions = self.cf(cf::VERSIONS)?;

        let mut batch = WriteBatch::default();
        for (member, score) in writes {
            let key = Self::composite_key(board_key, member.as_str())?;
            batch.put_cf(&cf_scores, key, Self::serialize_score(*score)?);
        }
        batch.put_cf(
            &cf_versions,
            board_key.as_bytes(),
            (token.0 + 1).to_le_bytes(),
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(CommitOutcome::Committed)
    }

    fn remove_from_boards(&self, board_keys: &[String], member: &UserId) -> Result<Vec<String>> {
        let _guard = self.commit_lock.lock();

        let cf_scores = self.cf(cf::SCORES)?;
        let cf_versions = self.cf(cf::VERSIONS)?;

        let mut batch = WriteBatch::default();
        let mut removed = Vec::new();
        for board_key in board_keys {
            let key = Self::composite_key(board_key, member.as_str())?;
            let present = self
                .db
                .get_cf(&cf_scores, &key)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some();
            if present {
                batch.delete_cf(&cf_scores, &key);
                let version = self.board_version(board_key)?;
                batch.put_cf(
                    &cf_versions,
                    board_key.as_bytes(),
                    (version + 1).to_le_bytes(),
                );
                removed.push(board_key.clone());
            }
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(removed)
    }

    // =========================================================================
    // Plain-Set Operations
    // =========================================================================

    fn add_set_member(&self, set_key: &str, member: &str) -> Result<bool> {
        let cf = self.cf(cf::SETS)?;
        let key = Self::composite_key(set_key, member)?;

        let already_present = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if already_present {
            return Ok(false);
        }

        self.db
            .put_cf(&cf, key, [])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(true)
    }

    fn set_members(&self, set_key: &str) -> Result<Vec<String>> {
        Ok(self
            .scan_members(cf::SETS, set_key)?
            .into_iter()
            .map(|(member, _)| member)
            .collect())
    }

    fn delete_key(&self, set_key: &str) -> Result<bool> {
        let cf = self.cf(cf::SETS)?;
        let members = self.scan_members(cf::SETS, set_key)?;
        if members.is_empty() {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        for (member, _) in &members {
            batch.delete_cf(&cf, Self::composite_key(set_key, member)?);
        }
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (RocksScoreStore, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let store = RocksScoreStore::open(dir.path()).expect("open store");
        (store, dir)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn commit_and_read_back() {
        let (store, _dir) = open_store();
        let token = store.watch("board").unwrap();
        assert_eq!(
            store
                .commit_scores("board", token, &[(user("a"), 2.0), (user("b"), 1.0)])
                .unwrap(),
            CommitOutcome::Committed
        );

        assert_eq!(store.member_score("board", &user("a")).unwrap(), Some(2.0));
        let top = store.top_members("board", 10).unwrap();
        assert_eq!(top[0].user_id.as_str(), "a");
        assert_eq!(top[1].user_id.as_str(), "b");
    }

    #[test]
    fn stale_token_conflicts() {
        let (store, _dir) = open_store();
        let stale = store.watch("board").unwrap();

        let fresh = store.watch("board").unwrap();
        store
            .commit_scores("board", fresh, &[(user("x"), 1.0)])
            .unwrap();

        assert_eq!(
            store
                .commit_scores("board", stale, &[(user("y"), 1.0)])
                .unwrap(),
            CommitOutcome::Conflict
        );
        assert_eq!(store.member_score("board", &user("y")).unwrap(), None);
    }

    #[test]
    fn remove_from_boards_bumps_versions() {
        let (store, _dir) = open_store();
        let token = store.watch("b1").unwrap();
        store.commit_scores("b1", token, &[(user("a"), 1.0)]).unwrap();

        let watched = store.watch("b1").unwrap();
        let removed = store
            .remove_from_boards(&["b1".into(), "b2".into()], &user("a"))
            .unwrap();
        assert_eq!(removed, vec!["b1".to_owned()]);

        // The removal counts as a write, so a commit watched before it loses.
        assert_eq!(
            store
                .commit_scores("b1", watched, &[(user("a"), 9.0)])
                .unwrap(),
            CommitOutcome::Conflict
        );
    }

    #[test]
    fn set_ops_roundtrip() {
        let (store, _dir) = open_store();
        assert!(store.add_set_member("s", "m1").unwrap());
        assert!(!store.add_set_member("s", "m1").unwrap());
        assert!(store.add_set_member("s", "m2").unwrap());

        assert_eq!(store.set_members("s").unwrap(), vec!["m1", "m2"]);
        assert!(store.delete_key("s").unwrap());
        assert!(store.set_members("s").unwrap().is_empty());
        assert!(!store.delete_key("s").unwrap());
    }

    #[test]
    fn nul_bytes_in_key_parts_are_rejected() {
        let (store, _dir) = open_store();

        let err = store.member_score("board", &user("a\0b")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));

        let token = store.watch("board").unwrap();
        let err = store
            .commit_scores("board", token, &[(user("a\0b"), 1.0)])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        // The rejected write must not have landed under a mangled key.
        assert!(store.top_members("board", 10).unwrap().is_empty());

        let err = store.add_set_member("s\0s", "m").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn boards_survive_reopen() {
        let dir = TempDir::new().expect("create temp dir");
        {
            let store = RocksScoreStore::open(dir.path()).expect("open store");
            let token = store.watch("board").unwrap();
            store
                .commit_scores("board", token, &[(user("a"), 4.0)])
                .unwrap();
        }

        let store = RocksScoreStore::open(dir.path()).expect("reopen store");
        assert_eq!(store.member_score("board", &user("a")).unwrap(), Some(4.0));
    }
}
