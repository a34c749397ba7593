//! Test fixtures and store implementations for integration testing

#![allow(dead_code)]

use karteando_standings::config::StandingsSettings;
use karteando_standings::error::{Result, StandingsError};
use karteando_standings::rating::{
    EloConfig, EloRatingCalculator, InMemoryStandingsStore, StandingEntry, StandingsStore,
};
use karteando_standings::standings::StandingsService;
use karteando_standings::types::{RaceFinisher, RaceResult, RaceSubmission, Rating, TeamId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Store that wraps the in-memory store and can be told to fail batch writes
#[derive(Debug, Default)]
pub struct FlakyStandingsStore {
    inner: InMemoryStandingsStore,
    fail_batch_writes: AtomicBool,
    batch_writes: AtomicUsize,
}

impl FlakyStandingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `store_standings` call fail
    pub fn fail_batch_writes(&self, fail: bool) {
        self.fail_batch_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful batch writes
    pub fn batch_writes(&self) -> usize {
        self.batch_writes.load(Ordering::SeqCst)
    }
}

impl StandingsStore for FlakyStandingsStore {
    fn get_standing(&self, team_id: &TeamId) -> Result<Option<StandingEntry>> {
        self.inner.get_standing(team_id)
    }

    fn store_standing(&self, entry: StandingEntry) -> Result<()> {
        self.inner.store_standing(entry)
    }

    fn get_standings(&self, team_ids: &[TeamId]) -> Result<HashMap<TeamId, StandingEntry>> {
        self.inner.get_standings(team_ids)
    }

    fn store_standings(&self, entries: Vec<StandingEntry>) -> Result<()> {
        if self.fail_batch_writes.load(Ordering::SeqCst) {
            return Err(StandingsError::InternalError {
                message: "standings backend unavailable".to_string(),
            }
            .into());
        }

        self.inner.store_standings(entries)?;
        self.batch_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_all_standings(&self) -> Result<HashMap<TeamId, StandingEntry>> {
        self.inner.get_all_standings()
    }

    fn remove_standing(&self, team_id: &TeamId) -> Result<bool> {
        self.inner.remove_standing(team_id)
    }

    fn get_teams_by_rating_range(
        &self,
        min_rating: Rating,
        max_rating: Rating,
        limit: Option<usize>,
    ) -> Result<Vec<StandingEntry>> {
        self.inner
            .get_teams_by_rating_range(min_rating, max_rating, limit)
    }

    fn get_team_count(&self) -> Result<usize> {
        self.inner.get_team_count()
    }
}

/// Standings service backed by a fresh in-memory store
pub fn create_test_service(auto_register: bool) -> StandingsService {
    create_service_with_store(Arc::new(InMemoryStandingsStore::new()), auto_register)
}

/// Standings service backed by the given store and default ELO settings
pub fn create_service_with_store(
    store: Arc<dyn StandingsStore>,
    auto_register: bool,
) -> StandingsService {
    create_service_with_config(store, EloConfig::default(), auto_register)
}

pub fn create_service_with_config(
    store: Arc<dyn StandingsStore>,
    config: EloConfig,
    auto_register: bool,
) -> StandingsService {
    let calculator = EloRatingCalculator::new(config).expect("valid ELO config");
    StandingsService::new(
        Arc::new(calculator),
        store,
        StandingsSettings {
            auto_register_teams: auto_register,
            ..StandingsSettings::default()
        },
    )
}

/// Race submission with squadrons listed in finishing order
pub fn submission(order: &[&str]) -> RaceSubmission {
    RaceSubmission {
        race_id: None,
        finishers: order
            .iter()
            .enumerate()
            .map(|(i, team)| RaceFinisher {
                team_id: team.to_string(),
                finish_position: i as u32 + 1,
            })
            .collect(),
    }
}

/// Race results with `(team, rating)` pairs listed in finishing order
pub fn results(field: &[(&str, Rating)]) -> Vec<RaceResult> {
    field
        .iter()
        .enumerate()
        .map(|(i, (team, rating))| RaceResult::new(*team, *rating, i as u32 + 1))
        .collect()
}

/// Seed a squadron directly into the store at the given rating
pub fn seed_team(store: &dyn StandingsStore, team_id: &str, rating: Rating) {
    store
        .store_standing(StandingEntry::new(
            team_id.to_string(),
            team_id.to_string(),
            rating,
        ))
        .expect("seed standing");
}
