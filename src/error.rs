//! Error types for the standings service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific standings scenarios
#[derive(Debug, thiserror::Error)]
pub enum StandingsError {
    #[error("Invalid race result: {reason}")]
    InvalidRaceResult { reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Team not found: {team_id}")]
    TeamNotFound { team_id: String },

    #[error("Team already exists: {team_id}")]
    TeamAlreadyExists { team_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl StandingsError {
    /// Short machine-readable label, used for metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            StandingsError::InvalidRaceResult { .. } => "invalid_race_result",
            StandingsError::InvalidRequest { .. } => "invalid_request",
            StandingsError::TeamNotFound { .. } => "team_not_found",
            StandingsError::TeamAlreadyExists { .. } => "team_already_exists",
            StandingsError::ConfigurationError { .. } => "configuration_error",
            StandingsError::InternalError { .. } => "internal_error",
        }
    }
}
