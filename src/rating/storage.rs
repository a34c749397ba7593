//! Standings storage interface and implementations
//!
//! This module defines the interface for persisting and retrieving squadron
//! standings, with an in-memory implementation used by the service.

use crate::rating::division::classify_division;
use crate::types::{DivisionTier, Rating, RatingChangeResult, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Storage entry for a squadron's standing with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub team_id: TeamId,
    pub name: String,
    pub rating: Rating,
    pub races_completed: u64,
    pub wins: u64,
    pub podiums: u64,
    pub last_race_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StandingEntry {
    /// Create a new standing entry for a squadron that has not raced yet
    pub fn new(team_id: TeamId, name: String, initial_rating: Rating) -> Self {
        let now = Utc::now();
        Self {
            team_id,
            name,
            rating: initial_rating,
            races_completed: 0,
            wins: 0,
            podiums: 0,
            last_race_at: None,
            last_updated: now,
            created_at: now,
        }
    }

    /// Division derived from the current rating
    pub fn division(&self) -> DivisionTier {
        classify_division(self.rating)
    }

    /// Apply a rating change produced for this squadron
    pub fn apply_race(&mut self, change: &RatingChangeResult, raced_at: DateTime<Utc>) {
        self.rating = change.rating_after;
        self.races_completed += 1;
        if change.finish_position == 1 {
            self.wins += 1;
        }
        if change.finish_position <= 3 {
            self.podiums += 1;
        }
        self.last_race_at = Some(raced_at);
        self.last_updated = Utc::now();
    }
}

/// Trait for standings storage operations
#[cfg_attr(test, mockall::automock)]
pub trait StandingsStore: Send + Sync {
    /// Get a squadron's standing
    fn get_standing(&self, team_id: &TeamId) -> crate::error::Result<Option<StandingEntry>>;

    /// Store or update a squadron's standing
    fn store_standing(&self, entry: StandingEntry) -> crate::error::Result<()>;

    /// Get standings for multiple squadrons
    fn get_standings(
        &self,
        team_ids: &[TeamId],
    ) -> crate::error::Result<HashMap<TeamId, StandingEntry>>;

    /// Store multiple standing updates atomically
    fn store_standings(&self, entries: Vec<StandingEntry>) -> crate::error::Result<()>;

    /// Get every stored standing
    fn get_all_standings(&self) -> crate::error::Result<HashMap<TeamId, StandingEntry>>;

    /// Remove a squadron's standing
    fn remove_standing(&self, team_id: &TeamId) -> crate::error::Result<bool>;

    /// Get squadrons within an inclusive rating range, highest rating first
    fn get_teams_by_rating_range(
        &self,
        min_rating: Rating,
        max_rating: Rating,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<StandingEntry>>;

    /// Get total number of registered squadrons
    fn get_team_count(&self) -> crate::error::Result<usize>;
}

/// In-memory standings storage implementation
#[derive(Debug, Default)]
pub struct InMemoryStandingsStore {
    standings: RwLock<HashMap<TeamId, StandingEntry>>,
}

impl InMemoryStandingsStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> crate::error::Result<std::sync::RwLockReadGuard<'_, HashMap<TeamId, StandingEntry>>> {
        self.standings.read().map_err(|_| {
            crate::error::StandingsError::InternalError {
                message: "Failed to acquire standings read lock".to_string(),
            }
            .into()
        })
    }

    fn write(
        &self,
    ) -> crate::error::Result<std::sync::RwLockWriteGuard<'_, HashMap<TeamId, StandingEntry>>> {
        self.standings.write().map_err(|_| {
            crate::error::StandingsError::InternalError {
                message: "Failed to acquire standings write lock".to_string(),
            }
            .into()
        })
    }
}

impl StandingsStore for InMemoryStandingsStore {
    fn get_standing(&self, team_id: &TeamId) -> crate::error::Result<Option<StandingEntry>> {
        Ok(self.read()?.get(team_id).cloned())
    }

    fn store_standing(&self, entry: StandingEntry) -> crate::error::Result<()> {
        self.write()?.insert(entry.team_id.clone(), entry);
        Ok(())
    }

    fn get_standings(
        &self,
        team_ids: &[TeamId],
    ) -> crate::error::Result<HashMap<TeamId, StandingEntry>> {
        let standings = self.read()?;

        let mut result = HashMap::new();
        for team_id in team_ids {
            if let Some(entry) = standings.get(team_id) {
                result.insert(team_id.clone(), entry.clone());
            }
        }

        Ok(result)
    }

    fn store_standings(&self, entries: Vec<StandingEntry>) -> crate::error::Result<()> {
        // Single write guard for the whole batch
        let mut standings = self.write()?;

        for entry in entries {
            standings.insert(entry.team_id.clone(), entry);
        }

        Ok(())
    }

    fn get_all_standings(&self) -> crate::error::Result<HashMap<TeamId, StandingEntry>> {
        Ok(self.read()?.clone())
    }

    fn remove_standing(&self, team_id: &TeamId) -> crate::error::Result<bool> {
        Ok(self.write()?.remove(team_id).is_some())
    }

    fn get_teams_by_rating_range(
        &self,
        min_rating: Rating,
        max_rating: Rating,
        limit: Option<usize>,
    ) -> crate::error::Result<Vec<StandingEntry>> {
        let standings = self.read()?;

        let mut matching_entries: Vec<StandingEntry> = standings
            .values()
            .filter(|entry| entry.rating >= min_rating && entry.rating <= max_rating)
            .cloned()
            .collect();

        matching_entries.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });

        if let Some(limit) = limit {
            matching_entries.truncate(limit);
        }

        Ok(matching_entries)
    }

    fn get_team_count(&self) -> crate::error::Result<usize> {
        Ok(self.read()?.len())
    }
}
