//! Rating calculator trait and the ELO implementation
//!
//! The calculator is the seam between the standings service and the pure
//! engine. Unlike the engine it checks that a race is well formed before
//! computing anything.

use crate::error::StandingsError;
use crate::rating::elo::{EloConfig, EloRatingEngine};
use crate::types::{RaceResult, Rating, RatingChangeResult};
use crate::utils::mean;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Result of a rating calculation for one race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceRatingCalculation {
    /// Rating changes in input order
    pub changes: Vec<RatingChangeResult>,
    /// Mean rating of the whole field before the race
    pub field_average: f64,
}

/// Trait for calculating rating changes after races
pub trait RatingCalculator: Send + Sync {
    /// Calculate rating changes for every squadron in a finished race
    ///
    /// # Arguments
    /// * `results` - One entry per squadron with its pre-race rating and
    ///   finishing position (1 = first place)
    fn calculate_race(&self, results: &[RaceResult])
        -> crate::error::Result<RaceRatingCalculation>;

    /// Rating for newly registered squadrons
    fn initial_rating(&self) -> Rating;

    /// Current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Check that a race has unique squadrons and positions forming `1..=N`
pub fn validate_race(results: &[RaceResult]) -> crate::error::Result<()> {
    if results.is_empty() {
        return Err(StandingsError::InvalidRaceResult {
            reason: "No results provided for rating calculation".to_string(),
        }
        .into());
    }

    let mut seen_teams = HashSet::new();
    for result in results {
        if result.team_id.is_empty() {
            return Err(StandingsError::InvalidRaceResult {
                reason: "Team id cannot be empty".to_string(),
            }
            .into());
        }
        if !seen_teams.insert(result.team_id.as_str()) {
            return Err(StandingsError::InvalidRaceResult {
                reason: format!("Team {} appears more than once", result.team_id),
            }
            .into());
        }
    }

    let mut positions: Vec<u32> = results.iter().map(|r| r.finish_position).collect();
    positions.sort_unstable();
    let expected = 1..=results.len() as u32;
    if !positions.iter().copied().eq(expected) {
        return Err(StandingsError::InvalidRaceResult {
            reason: format!(
                "Finish positions must be 1..={} with no gaps or duplicates, got {:?}",
                results.len(),
                positions
            ),
        }
        .into());
    }

    Ok(())
}

/// ELO rating calculator used in production
#[derive(Debug, Clone, Default)]
pub struct EloRatingCalculator {
    engine: EloRatingEngine,
}

impl EloRatingCalculator {
    /// Create a new ELO calculator
    pub fn new(config: EloConfig) -> crate::error::Result<Self> {
        Ok(Self {
            engine: EloRatingEngine::new(config)?,
        })
    }

    pub fn engine(&self) -> &EloRatingEngine {
        &self.engine
    }
}

impl RatingCalculator for EloRatingCalculator {
    fn calculate_race(
        &self,
        results: &[RaceResult],
    ) -> crate::error::Result<RaceRatingCalculation> {
        validate_race(results)?;

        let changes = self.engine.race_rating_changes(results);
        let field_average =
            mean(results.iter().map(|r| r.rating_before as f64)).unwrap_or_default();

        debug!(
            "Calculated {} rating changes, field average {:.1}",
            changes.len(),
            field_average
        );

        Ok(RaceRatingCalculation {
            changes,
            field_average,
        })
    }

    fn initial_rating(&self) -> Rating {
        self.engine.config().initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(self.engine.config()).unwrap_or(serde_json::Value::Null)
    }
}
