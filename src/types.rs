//! Common types used throughout the standings service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for squadrons
pub type TeamId = String;

/// Unique identifier for races
pub type RaceId = Uuid;

/// Integer ELO rating of a squadron
pub type Rating = i32;

/// Division a squadron belongs to, derived from its current rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DivisionTier {
    Open,
    Pro,
    Masters,
    Elite,
}

impl DivisionTier {
    /// All tiers, lowest first
    pub const ALL: [DivisionTier; 4] = [
        DivisionTier::Open,
        DivisionTier::Pro,
        DivisionTier::Masters,
        DivisionTier::Elite,
    ];

    /// Ordinal rank of the tier (Open = 1 ... Elite = 4)
    pub fn rank(self) -> u8 {
        match self {
            DivisionTier::Open => 1,
            DivisionTier::Pro => 2,
            DivisionTier::Masters => 3,
            DivisionTier::Elite => 4,
        }
    }

    /// Lowercase label used for metrics
    pub fn as_label(self) -> &'static str {
        match self {
            DivisionTier::Open => "open",
            DivisionTier::Pro => "pro",
            DivisionTier::Masters => "masters",
            DivisionTier::Elite => "elite",
        }
    }
}

impl std::fmt::Display for DivisionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DivisionTier::Open => write!(f, "Open"),
            DivisionTier::Pro => write!(f, "Pro"),
            DivisionTier::Masters => write!(f, "Masters"),
            DivisionTier::Elite => write!(f, "Elite"),
        }
    }
}

impl std::str::FromStr for DivisionTier {
    type Err = crate::error::StandingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(DivisionTier::Open),
            "pro" => Ok(DivisionTier::Pro),
            "masters" => Ok(DivisionTier::Masters),
            "elite" => Ok(DivisionTier::Elite),
            _ => Err(crate::error::StandingsError::InvalidRequest {
                reason: format!("Unknown division: {}", s),
            }),
        }
    }
}

/// One squadron's participation in a race, as fed to the rating engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub team_id: TeamId,
    pub rating_before: Rating,
    pub finish_position: u32,
}

impl RaceResult {
    pub fn new(team_id: impl Into<TeamId>, rating_before: Rating, finish_position: u32) -> Self {
        Self {
            team_id: team_id.into(),
            rating_before,
            finish_position,
        }
    }
}

/// Rating adjustment produced for one squadron after a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChangeResult {
    pub team_id: TeamId,
    pub rating_before: Rating,
    pub rating_after: Rating,
    /// Unclamped engine delta
    pub delta: i32,
    pub finish_position: u32,
    pub opponent_average_rating: f64,
}

/// A squadron's finishing position as reported by the race pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceFinisher {
    pub team_id: TeamId,
    pub finish_position: u32,
}

/// Finished race submitted for rating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSubmission {
    /// Caller-supplied race id; generated when absent
    #[serde(default)]
    pub race_id: Option<RaceId>,
    pub finishers: Vec<RaceFinisher>,
}

/// Result of recording (or previewing) a race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceOutcome {
    pub race_id: RaceId,
    pub recorded_at: DateTime<Utc>,
    pub field_average: f64,
    pub changes: Vec<RatingChangeResult>,
    /// False for previews
    pub persisted: bool,
}

/// Public view of a squadron in the standings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingView {
    pub rank: usize,
    pub team_id: TeamId,
    pub name: String,
    pub rating: Rating,
    pub division: DivisionTier,
    pub races_completed: u64,
    pub wins: u64,
    pub podiums: u64,
    pub last_race_at: Option<DateTime<Utc>>,
}

/// Outcome of a division eligibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationCheck {
    pub team_id: TeamId,
    pub rating: Rating,
    pub current_division: DivisionTier,
    pub target_division: DivisionTier,
    pub allow_lower_tiers: bool,
    pub qualified: bool,
}
