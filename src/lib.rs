//! Karteando standings - squadron ELO ratings for go-kart races
//!
//! This crate rates finished races with a multi-competitor ELO model,
//! keeps per-squadron standings, classifies squadrons into divisions and
//! serves all of it over a JSON HTTP API.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod standings;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Result, StandingsError};
pub use types::*;

// Re-export key components
pub use rating::{EloRatingCalculator, EloRatingEngine, RatingCalculator};
pub use standings::StandingsService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
