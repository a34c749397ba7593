//! Squadron rating system
//!
//! This module provides the pure ELO engine, division classification, the
//! calculator seam used by the service, and the standings storage interface.

pub mod calculator;
pub mod division;
pub mod elo;
pub mod storage;

// Re-export commonly used types
pub use calculator::{EloRatingCalculator, RaceRatingCalculation, RatingCalculator};
pub use division::{classify_division, is_qualified_for_division};
pub use elo::{
    compute_actual_score, compute_expected_score, compute_race_rating_changes,
    compute_rating_delta, EloConfig, EloRatingEngine, OpponentExclusion,
};
pub use storage::{InMemoryStandingsStore, StandingEntry, StandingsStore};
