//! Leaderboard orchestration engine for stat-ladder.
//!
//! [`LeaderboardEngine`] is the entry point the HTTP layer calls into. It
//! resolves the score policy for a product, reads and writes leaderboards
//! through the injected [`ScoreStore`](stat_ladder_store::ScoreStore), and
//! keeps each user's leaderboard-membership index in sync as a side effect of
//! every score write.
//!
//! # Outcome mapping for the HTTP layer
//!
//! - [`LeaderboardEngine::record_result`]: `Ok(true)` → recorded; `Ok(false)`
//!   → retry budget exhausted under write contention (map to 5xx); `Err` →
//!   invalid product or storage failure.
//! - [`LeaderboardEngine::remove_user`]: `Err` → storage failure (500);
//!   `Ok(vec![])` → user had no leaderboard memberships (404); `Ok(keys)` →
//!   removed from those leaderboards (200).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod engine;

pub use engine::{LeaderboardEngine, DEFAULT_RETRY_BUDGET, DEFAULT_TOP_COUNT};
