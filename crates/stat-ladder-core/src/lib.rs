//! Core types and utilities for stat-ladder.
//!
//! This crate provides the foundational types used throughout the stat-ladder
//! leaderboard service:
//!
//! - **Identifiers**: `ProductId`, `UserId`
//! - **Score policies**: `ScorePolicy`, `WinLossPolicy`
//! - **Registry**: `PolicyRegistry`
//! - **Errors**: `LadderError`
//!
//! # Scores
//!
//! Scores are stored as `f64` to match the ordered-set semantics of the
//! backing store. The default policy only ever produces whole numbers, but
//! custom policies are free to use fractional scores.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod policy;
pub mod registry;

pub use error::{LadderError, Result};
pub use ids::{ProductId, UserId};
pub use policy::{ScorePolicy, WinLossPolicy};
pub use registry::{PolicyRegistry, DEFAULT_PRODUCT_ID};
