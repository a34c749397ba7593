//! Multi-team ELO rating engine
//!
//! Each squadron is scored against the average rating of the rest of the
//! field. The expected score comes from the classic logistic ELO curve and
//! the actual score is the finishing position normalized to `[0, 1]`.
//!
//! All functions here are pure: they hold no state, do no I/O and never
//! validate their input. Malformed races produce meaningless numbers rather
//! than errors; validation belongs to [`crate::rating::RatingCalculator`]
//! implementations.

use crate::error::StandingsError;
use crate::types::{Rating, RaceResult, RatingChangeResult};
use crate::utils::{mean, round_half_up};
use serde::{Deserialize, Serialize};
use skillratings::elo::EloRating;

/// Default K-factor
pub const K_FACTOR: f64 = 32.0;

/// Lowest rating a squadron can fall to
pub const MIN_RATING: Rating = 800;

/// Highest rating a squadron can reach
pub const MAX_RATING: Rating = 2500;

/// Rating given to newly registered squadrons
pub const INITIAL_RATING: Rating = 1500;

/// How a squadron's own entry is removed from the opponent pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentExclusion {
    /// Drop every entry whose rating equals the squadron's own rating.
    /// Squadrons tied on rating are removed from each other's pool.
    #[default]
    ByValue,
    /// Drop only the squadron's own entry
    ByPosition,
}

impl std::str::FromStr for OpponentExclusion {
    type Err = StandingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "by_value" | "value" => Ok(OpponentExclusion::ByValue),
            "by_position" | "position" => Ok(OpponentExclusion::ByPosition),
            _ => Err(StandingsError::ConfigurationError {
                message: format!("Unknown opponent exclusion mode: {}", s),
            }),
        }
    }
}

/// Configuration for the ELO engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    pub k_factor: f64,
    pub min_rating: Rating,
    pub max_rating: Rating,
    pub initial_rating: Rating,
    pub opponent_exclusion: OpponentExclusion,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: K_FACTOR,
            min_rating: MIN_RATING,
            max_rating: MAX_RATING,
            initial_rating: INITIAL_RATING,
            opponent_exclusion: OpponentExclusion::ByValue,
        }
    }
}

impl EloConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(StandingsError::ConfigurationError {
                message: "K-factor must be a positive number".to_string(),
            }
            .into());
        }

        if self.min_rating >= self.max_rating {
            return Err(StandingsError::ConfigurationError {
                message: format!(
                    "Minimum rating ({}) must be below maximum rating ({})",
                    self.min_rating, self.max_rating
                ),
            }
            .into());
        }

        if self.initial_rating < self.min_rating || self.initial_rating > self.max_rating {
            return Err(StandingsError::ConfigurationError {
                message: format!(
                    "Initial rating ({}) must lie within [{}, {}]",
                    self.initial_rating, self.min_rating, self.max_rating
                ),
            }
            .into());
        }

        Ok(())
    }
}

/// Probability-like expectation of beating the average opponent
///
/// `1 / (1 + 10^((opponent_average - my_rating) / 400))`
pub fn compute_expected_score(my_rating: f64, opponent_average_rating: f64) -> f64 {
    let (expected, _) = skillratings::elo::expected_score(
        &EloRating { rating: my_rating },
        &EloRating {
            rating: opponent_average_rating,
        },
    );
    expected
}

/// Finishing position mapped linearly onto `[0, 1]`, first place scoring 1
///
/// A race with one participant (or none) is a no-contest and scores 0.5.
pub fn compute_actual_score(position: u32, total_participants: usize) -> f64 {
    if total_participants <= 1 {
        return 0.5;
    }

    let total = total_participants as f64;
    (total - position as f64) / (total - 1.0)
}

/// Rating delta for one squadron using the default configuration
pub fn compute_rating_delta(my_rating: Rating, position: u32, all_ratings: &[Rating]) -> i32 {
    EloRatingEngine::default().rating_delta(my_rating, position, all_ratings)
}

/// Rating changes for a whole race using the default configuration
pub fn compute_race_rating_changes(results: &[RaceResult]) -> Vec<RatingChangeResult> {
    EloRatingEngine::default().race_rating_changes(results)
}

/// ELO engine bound to a validated configuration
#[derive(Debug, Clone, Default)]
pub struct EloRatingEngine {
    config: EloConfig,
}

impl EloRatingEngine {
    /// Create a new engine, rejecting invalid configurations
    pub fn new(config: EloConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Clamp a rating into the configured bounds
    pub fn clamp_rating(&self, rating: Rating) -> Rating {
        rating.clamp(self.config.min_rating, self.config.max_rating)
    }

    /// Rating delta for a squadron given every rating in the race
    ///
    /// The squadron is identified by its rating value only, so the opponent
    /// pool always excludes by value here regardless of the configured
    /// exclusion mode.
    pub fn rating_delta(&self, my_rating: Rating, position: u32, all_ratings: &[Rating]) -> i32 {
        if all_ratings.len() < 2 {
            return 0;
        }

        let opponent_average = average_excluding_value(my_rating, all_ratings);
        self.delta_against(my_rating, opponent_average, position, all_ratings.len())
    }

    /// Average rating of the opponents of the squadron at `index`
    ///
    /// Falls back to the squadron's own rating when nothing is left in the
    /// pool, which yields an expected score of exactly 0.5.
    pub fn opponent_average(&self, index: usize, all_ratings: &[Rating]) -> f64 {
        let my_rating = all_ratings[index];

        match self.config.opponent_exclusion {
            OpponentExclusion::ByValue => average_excluding_value(my_rating, all_ratings),
            OpponentExclusion::ByPosition => mean(
                all_ratings
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, r)| *r as f64),
            )
            .unwrap_or(my_rating as f64),
        }
    }

    /// Rating changes for every participant of a race, in input order
    pub fn race_rating_changes(&self, results: &[RaceResult]) -> Vec<RatingChangeResult> {
        let ratings: Vec<Rating> = results.iter().map(|r| r.rating_before).collect();

        results
            .iter()
            .enumerate()
            .map(|(index, result)| {
                let opponent_average = self.opponent_average(index, &ratings);
                let delta = if ratings.len() < 2 {
                    0
                } else {
                    self.delta_against(
                        result.rating_before,
                        opponent_average,
                        result.finish_position,
                        ratings.len(),
                    )
                };

                RatingChangeResult {
                    team_id: result.team_id.clone(),
                    rating_before: result.rating_before,
                    rating_after: self.clamp_rating(result.rating_before.saturating_add(delta)),
                    delta,
                    finish_position: result.finish_position,
                    opponent_average_rating: opponent_average,
                }
            })
            .collect()
    }

    fn delta_against(
        &self,
        my_rating: Rating,
        opponent_average: f64,
        position: u32,
        participants: usize,
    ) -> i32 {
        let expected = compute_expected_score(my_rating as f64, opponent_average);
        let actual = compute_actual_score(position, participants);

        round_half_up(self.config.k_factor * (actual - expected))
    }
}

fn average_excluding_value(my_rating: Rating, all_ratings: &[Rating]) -> f64 {
    mean(
        all_ratings
            .iter()
            .filter(|r| **r != my_rating)
            .map(|r| *r as f64),
    )
    .unwrap_or(my_rating as f64)
}
