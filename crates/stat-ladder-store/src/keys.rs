//! Storage key derivation.
//!
//! Key formats are shared with every other service instance that talks to
//! the same store, so they are fixed: changing them orphans existing
//! leaderboards.

use stat_ladder_core::{ProductId, UserId};

/// Sub-metric qualifier for win-count leaderboards.
///
/// The key scheme supports other metrics (losses, streaks, ...) but only
/// `"wins"` is wired up today; this is the extension point for new metrics.
pub const WINS: &str = "wins";

/// Derive the ranked-set key for one (product, sub-metric) leaderboard.
///
/// Format: `_lb:{sub_key}:{product_id}`.
#[must_use]
pub fn leaderboard_key(product_id: &ProductId, sub_key: &str) -> String {
    format!("_lb:{sub_key}:{product_id}")
}

/// Derive the plain-set key holding the leaderboards a user appears in.
///
/// Format: `_lb:{user_id}:leaderboard_set`.
#[must_use]
pub fn user_boards_key(user_id: &UserId) -> String {
    format!("_lb:{user_id}:leaderboard_set")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_key_format() {
        let key = leaderboard_key(&ProductId::new("exrps"), WINS);
        assert_eq!(key, "_lb:wins:exrps");
    }

    #[test]
    fn user_boards_key_format() {
        let key = user_boards_key(&UserId::new("abc123"));
        assert_eq!(key, "_lb:abc123:leaderboard_set");
    }

    #[test]
    fn distinct_products_get_distinct_boards() {
        let a = leaderboard_key(&ProductId::new("game_a"), WINS);
        let b = leaderboard_key(&ProductId::new("game_b"), WINS);
        assert_ne!(a, b);
    }
}
