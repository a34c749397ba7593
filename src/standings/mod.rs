//! Standings management
//!
//! This module turns race results into persisted squadron standings and
//! answers leaderboard and eligibility queries.

pub mod service;

pub use service::StandingsService;
