//! Score update policies.
//!
//! A policy computes the new scores for a winner/loser pair after a match.
//! Policies are pure: no I/O, no side effects, and the same inputs always
//! produce the same outputs. The engine may invoke a policy several times for
//! one match while its optimistic write loop retries, so anything stateful
//! here would corrupt scores.

use crate::ids::UserId;

/// Capability contract for score calculation.
///
/// `compute` receives each player's current score, or `None` when the player
/// has never appeared on the leaderboard.
pub trait ScorePolicy: Send + Sync {
    /// Compute `(winner_new_score, loser_new_score)` for a match result.
    fn compute(
        &self,
        winner_id: &UserId,
        winner_score: Option<f64>,
        loser_id: &UserId,
        loser_score: Option<f64>,
    ) -> (f64, f64);
}

/// The default policy: winners gain a point, losers keep their score.
///
/// An absent score counts as 0. The loser's score is only clamped at zero,
/// never decremented: a loser on 5 stays on 5, and a loser starting at 0 (or
/// below, from a custom policy) comes out at 0 rather than negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinLossPolicy;

impl ScorePolicy for WinLossPolicy {
    fn compute(
        &self,
        _winner_id: &UserId,
        winner_score: Option<f64>,
        _loser_id: &UserId,
        loser_score: Option<f64>,
    ) -> (f64, f64) {
        let winner_new = winner_score.unwrap_or(0.0) + 1.0;
        let loser_new = loser_score.unwrap_or(0.0).max(0.0);
        (winner_new, loser_new)
    }
}
