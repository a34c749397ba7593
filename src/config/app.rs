//! Main application configuration
//!
//! This module defines the primary configuration structures for the standings
//! service, including environment variable and TOML file loading and
//! validation.

use crate::rating::elo::{EloConfig, OpponentExclusion};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: EloConfig,
    pub standings: StandingsSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP API binds to
    pub http_host: String,
    /// Port for the HTTP API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Standings bookkeeping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StandingsSettings {
    /// Register unknown squadrons at the initial rating when they race
    pub auto_register_teams: bool,
    /// How often the per-division gauges are refreshed
    pub division_refresh_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "karteando-standings".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StandingsSettings {
    fn default() -> Self {
        Self {
            auto_register_teams: true,
            division_refresh_seconds: 30,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: String) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;

        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = parse_env("HTTP_PORT", port)?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = parse_env("SHUTDOWN_TIMEOUT_SECONDS", timeout)?;
        }

        // Rating settings
        if let Ok(k) = env::var("ELO_K_FACTOR") {
            self.rating.k_factor = parse_env("ELO_K_FACTOR", k)?;
        }
        if let Ok(min) = env::var("ELO_MIN_RATING") {
            self.rating.min_rating = parse_env("ELO_MIN_RATING", min)?;
        }
        if let Ok(max) = env::var("ELO_MAX_RATING") {
            self.rating.max_rating = parse_env("ELO_MAX_RATING", max)?;
        }
        if let Ok(initial) = env::var("ELO_INITIAL_RATING") {
            self.rating.initial_rating = parse_env("ELO_INITIAL_RATING", initial)?;
        }
        if let Ok(mode) = env::var("ELO_OPPONENT_EXCLUSION") {
            self.rating.opponent_exclusion = mode.parse::<OpponentExclusion>()?;
        }

        // Standings settings
        if let Ok(auto_register) = env::var("AUTO_REGISTER_TEAMS") {
            self.standings.auto_register_teams = parse_env("AUTO_REGISTER_TEAMS", auto_register)?;
        }
        if let Ok(refresh) = env::var("DIVISION_REFRESH_SECONDS") {
            self.standings.division_refresh_seconds = parse_env("DIVISION_REFRESH_SECONDS", refresh)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get division gauge refresh interval as Duration
    pub fn division_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.standings.division_refresh_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }
    if config.service.http_host.is_empty() {
        return Err(anyhow!("HTTP host cannot be empty"));
    }
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.standings.division_refresh_seconds == 0 {
        return Err(anyhow!("Division refresh interval must be greater than 0"));
    }

    config.rating.validate()?;

    Ok(())
}
