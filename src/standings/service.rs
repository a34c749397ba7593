//! Standings service
//!
//! Glues the rating calculator to the standings store: looks up current
//! ratings for a finished race, runs the calculator, and persists the new
//! standings in a single batch.

use crate::config::StandingsSettings;
use crate::error::{Result, StandingsError};
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::rating::division::{classify_division, is_qualified_for_division};
use crate::rating::{RatingCalculator, StandingEntry, StandingsStore};
use crate::types::{
    DivisionTier, QualificationCheck, RaceFinisher, RaceOutcome, RaceResult, RaceSubmission,
    StandingView, TeamId,
};
use crate::utils::{current_timestamp, generate_race_id};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Coordinates rating calculation and standings persistence
pub struct StandingsService {
    calculator: Arc<dyn RatingCalculator>,
    store: Arc<dyn StandingsStore>,
    settings: StandingsSettings,
    metrics: Option<Arc<MetricsCollector>>,
    /// Serializes read-modify-write cycles on the store
    write_lock: Mutex<()>,
}

impl StandingsService {
    pub fn new(
        calculator: Arc<dyn RatingCalculator>,
        store: Arc<dyn StandingsStore>,
        settings: StandingsSettings,
    ) -> Self {
        Self {
            calculator,
            store,
            settings,
            metrics: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> Arc<dyn StandingsStore> {
        self.store.clone()
    }

    pub fn calculator(&self) -> Arc<dyn RatingCalculator> {
        self.calculator.clone()
    }

    /// Register a new squadron at the initial rating
    pub fn register_team(&self, team_id: &str, name: Option<&str>) -> Result<StandingEntry> {
        let team_id = team_id.trim();
        if team_id.is_empty() {
            return Err(StandingsError::InvalidRequest {
                reason: "Team id cannot be empty".to_string(),
            }
            .into());
        }

        let _guard = self.lock_writes()?;

        if self.store.get_standing(&team_id.to_string())?.is_some() {
            warn!("Rejected duplicate registration for squadron '{}'", team_id);
            return Err(StandingsError::TeamAlreadyExists {
                team_id: team_id.to_string(),
            }
            .into());
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(team_id);
        let entry = StandingEntry::new(
            team_id.to_string(),
            name.to_string(),
            self.calculator.initial_rating(),
        );
        self.store.store_standing(entry.clone())?;

        info!(
            "Registered squadron '{}' at rating {}",
            entry.team_id, entry.rating
        );
        Ok(entry)
    }

    /// Remove a squadron from the standings
    pub fn remove_team(&self, team_id: &str) -> Result<()> {
        let _guard = self.lock_writes()?;

        if self.store.remove_standing(&team_id.to_string())? {
            info!("Removed squadron '{}' from standings", team_id);
            Ok(())
        } else {
            Err(StandingsError::TeamNotFound {
                team_id: team_id.to_string(),
            }
            .into())
        }
    }

    /// Rate a finished race and persist the new standings
    pub fn record_race(&self, submission: RaceSubmission) -> Result<RaceOutcome> {
        let _guard = self.lock_writes()?;
        let timer = MetricsTimer::start();

        let result = self
            .compute_race(&submission)
            .and_then(|(outcome, entries, calculation_time)| {
                self.store.store_standings(entries)?;
                Ok((outcome, calculation_time))
            });

        match result {
            Ok((mut outcome, calculation_time)) => {
                outcome.persisted = true;

                if let Some(metrics) = &self.metrics {
                    let deltas: Vec<i32> = outcome.changes.iter().map(|c| c.delta).collect();
                    metrics.record_race(&deltas, calculation_time);
                }

                info!(
                    "Recorded race {} with {} squadrons in {:.2}ms",
                    outcome.race_id,
                    outcome.changes.len(),
                    timer.stop().as_secs_f64() * 1000.0
                );
                for change in &outcome.changes {
                    debug!(
                        "  P{} '{}': {} -> {} ({:+})",
                        change.finish_position,
                        change.team_id,
                        change.rating_before,
                        change.rating_after,
                        change.delta
                    );
                }

                Ok(outcome)
            }
            Err(e) => {
                warn!("Race submission rejected: {}", e);
                if let Some(metrics) = &self.metrics {
                    let reason = e
                        .downcast_ref::<StandingsError>()
                        .map(StandingsError::kind)
                        .unwrap_or("internal_error");
                    metrics.record_race_error(reason);
                }
                Err(e)
            }
        }
    }

    /// Rate a race without touching the standings
    pub fn preview_race(&self, submission: RaceSubmission) -> Result<RaceOutcome> {
        let (outcome, _, calculation_time) = self.compute_race(&submission)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_rating_calculation(calculation_time);
        }

        debug!(
            "Previewed race {} with {} squadrons",
            outcome.race_id,
            outcome.changes.len()
        );
        Ok(outcome)
    }

    /// Standings ordered by rating, optionally restricted to one division
    ///
    /// Ranks are overall positions, so a filtered list keeps the ranks the
    /// squadrons hold in the full table.
    pub fn leaderboard(
        &self,
        division: Option<DivisionTier>,
        limit: Option<usize>,
    ) -> Result<Vec<StandingView>> {
        let ranked = self.ranked_standings()?;

        let views = ranked
            .into_iter()
            .filter(|view| division.map_or(true, |d| view.division == d))
            .take(limit.unwrap_or(usize::MAX))
            .collect::<Vec<_>>();

        debug!(
            "Leaderboard requested - division: {:?}, {} squadrons returned",
            division,
            views.len()
        );
        Ok(views)
    }

    /// Standing of a single squadron with its overall rank
    pub fn team_standing(&self, team_id: &str) -> Result<StandingView> {
        self.ranked_standings()?
            .into_iter()
            .find(|view| view.team_id == team_id)
            .ok_or_else(|| {
                StandingsError::TeamNotFound {
                    team_id: team_id.to_string(),
                }
                .into()
            })
    }

    /// Whether a squadron may enter an event held for `target`
    pub fn check_qualification(
        &self,
        team_id: &str,
        target: DivisionTier,
        allow_lower_tiers: bool,
    ) -> Result<QualificationCheck> {
        let entry = self
            .store
            .get_standing(&team_id.to_string())?
            .ok_or_else(|| StandingsError::TeamNotFound {
                team_id: team_id.to_string(),
            })?;

        let qualified = is_qualified_for_division(entry.rating, target, allow_lower_tiers);
        debug!(
            "Qualification check - squadron: '{}', rating: {}, target: {}, allow_lower: {}, qualified: {}",
            team_id, entry.rating, target, allow_lower_tiers, qualified
        );

        Ok(QualificationCheck {
            team_id: entry.team_id.clone(),
            rating: entry.rating,
            current_division: entry.division(),
            target_division: target,
            allow_lower_tiers,
            qualified,
        })
    }

    /// Number of squadrons in each division, every tier present
    pub fn division_summary(&self) -> Result<BTreeMap<DivisionTier, usize>> {
        let mut counts: BTreeMap<DivisionTier, usize> =
            DivisionTier::ALL.iter().map(|tier| (*tier, 0)).collect();

        for entry in self.store.get_all_standings()?.values() {
            *counts.entry(classify_division(entry.rating)).or_insert(0) += 1;
        }

        Ok(counts)
    }

    /// Push current division counts into the metrics gauges
    pub fn refresh_division_metrics(&self) -> Result<()> {
        if let Some(metrics) = &self.metrics {
            let counts = self.division_summary()?;
            metrics.update_division_counts(&counts);
        }
        Ok(())
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| {
            StandingsError::InternalError {
                message: "Failed to acquire standings write lock".to_string(),
            }
            .into()
        })
    }

    fn ranked_standings(&self) -> Result<Vec<StandingView>> {
        let mut entries: Vec<StandingEntry> =
            self.store.get_all_standings()?.into_values().collect();
        entries.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });

        Ok(entries
            .iter()
            .enumerate()
            .map(|(index, entry)| standing_view(index + 1, entry))
            .collect())
    }

    /// Compute the outcome and the updated entries without persisting them
    ///
    /// Also returns the time spent inside the calculator.
    fn compute_race(
        &self,
        submission: &RaceSubmission,
    ) -> Result<(RaceOutcome, Vec<StandingEntry>, Duration)> {
        if submission.finishers.is_empty() {
            return Err(StandingsError::InvalidRaceResult {
                reason: "Race has no finishers".to_string(),
            }
            .into());
        }

        // Ids are trimmed the same way registration trims them
        let mut finishers = Vec::with_capacity(submission.finishers.len());
        for finisher in &submission.finishers {
            let team_id = finisher.team_id.trim();
            if team_id.is_empty() {
                return Err(StandingsError::InvalidRaceResult {
                    reason: format!(
                        "Finisher at position {} has an empty team id",
                        finisher.finish_position
                    ),
                }
                .into());
            }
            finishers.push(RaceFinisher {
                team_id: team_id.to_string(),
                finish_position: finisher.finish_position,
            });
        }

        let team_ids: Vec<TeamId> = finishers.iter().map(|f| f.team_id.clone()).collect();
        let known = self.store.get_standings(&team_ids)?;

        let mut entries = Vec::with_capacity(finishers.len());
        for finisher in &finishers {
            let entry = match known.get(&finisher.team_id) {
                Some(entry) => entry.clone(),
                None if self.settings.auto_register_teams => {
                    info!(
                        "Auto-registering squadron '{}' at rating {}",
                        finisher.team_id,
                        self.calculator.initial_rating()
                    );
                    StandingEntry::new(
                        finisher.team_id.clone(),
                        finisher.team_id.clone(),
                        self.calculator.initial_rating(),
                    )
                }
                None => {
                    return Err(StandingsError::TeamNotFound {
                        team_id: finisher.team_id.clone(),
                    }
                    .into())
                }
            };
            entries.push(entry);
        }

        // Duplicate ids reach the calculator, which rejects the race
        let results: Vec<RaceResult> = finishers
            .iter()
            .zip(&entries)
            .map(|(finisher, entry)| {
                RaceResult::new(
                    finisher.team_id.clone(),
                    entry.rating,
                    finisher.finish_position,
                )
            })
            .collect();

        let timer = MetricsTimer::start();
        let calculation = self.calculator.calculate_race(&results)?;
        let calculation_time = timer.stop();
        let recorded_at = current_timestamp();

        for (entry, change) in entries.iter_mut().zip(&calculation.changes) {
            entry.apply_race(change, recorded_at);
        }

        let outcome = RaceOutcome {
            race_id: submission.race_id.unwrap_or_else(generate_race_id),
            recorded_at,
            field_average: calculation.field_average,
            changes: calculation.changes,
            persisted: false,
        };

        Ok((outcome, entries, calculation_time))
    }
}

fn standing_view(rank: usize, entry: &StandingEntry) -> StandingView {
    StandingView {
        rank,
        team_id: entry.team_id.clone(),
        name: entry.name.clone(),
        rating: entry.rating,
        division: entry.division(),
        races_completed: entry.races_completed,
        wins: entry.wins,
        podiums: entry.podiums,
        last_race_at: entry.last_race_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::storage::MockStandingsStore;
    use crate::rating::{EloRatingCalculator, InMemoryStandingsStore};
    use std::collections::HashMap;

    fn create_service(auto_register: bool) -> StandingsService {
        StandingsService::new(
            Arc::new(EloRatingCalculator::default()),
            Arc::new(InMemoryStandingsStore::new()),
            StandingsSettings {
                auto_register_teams: auto_register,
                ..StandingsSettings::default()
            },
        )
    }

    fn submission(order: &[&str]) -> RaceSubmission {
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

    #[test]
    fn test_register_team() {
        let service = create_service(false);

        let entry = service.register_team("halcones", Some("Halcones")).unwrap();
        assert_eq!(entry.rating, 1500);
        assert_eq!(entry.name, "Halcones");

        let unnamed = service.register_team("zorros", None).unwrap();
        assert_eq!(unnamed.name, "zorros");

        let err = service.register_team("halcones", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StandingsError>(),
            Some(StandingsError::TeamAlreadyExists { .. })
        ));

        assert!(service.register_team("  ", None).is_err());
    }

    #[test]
    fn test_record_race_updates_standings() {
        let service = create_service(true);

        let outcome = service
            .record_race(submission(&["a", "b", "c", "d"]))
            .unwrap();

        assert!(outcome.persisted);
        let deltas: Vec<i32> = outcome.changes.iter().map(|c| c.delta).collect();
        assert_eq!(deltas, vec![16, 5, -5, -16]);

        let winner = service.team_standing("a").unwrap();
        assert_eq!(winner.rank, 1);
        assert_eq!(winner.rating, 1516);
        assert_eq!(winner.wins, 1);
        assert_eq!(winner.podiums, 1);
        assert_eq!(winner.races_completed, 1);

        let last = service.team_standing("d").unwrap();
        assert_eq!(last.rank, 4);
        assert_eq!(last.rating, 1484);
        assert_eq!(last.division, DivisionTier::Open);
        assert_eq!(last.podiums, 0);
    }

    #[test]
    fn test_ratings_carry_between_races() {
        let service = create_service(true);

        service.record_race(submission(&["a", "b"])).unwrap();
        let second = service.record_race(submission(&["b", "a"])).unwrap();

        assert_eq!(second.changes[0].team_id, "b");
        assert_eq!(second.changes[0].rating_before, 1484);
        assert_eq!(second.changes[1].rating_before, 1516);
        assert_eq!(service.team_standing("a").unwrap().races_completed, 2);
    }

    #[test]
    fn test_unknown_team_without_auto_register() {
        let service = create_service(false);
        service.register_team("a", None).unwrap();

        let err = service.record_race(submission(&["a", "ghost"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StandingsError>(),
            Some(StandingsError::TeamNotFound { .. })
        ));

        // Nothing was persisted
        assert_eq!(service.team_standing("a").unwrap().races_completed, 0);
    }

    #[test]
    fn test_invalid_race_is_rejected() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let service = create_service(true).with_metrics(metrics.clone());

        let mut bad = submission(&["a", "b"]);
        bad.finishers[1].finish_position = 1;
        assert!(service.record_race(bad).is_err());

        let duplicate = submission(&["a", "a"]);
        assert!(service.record_race(duplicate).is_err());

        assert!(service.record_race(submission(&[])).is_err());

        assert_eq!(
            metrics
                .rating()
                .race_errors_total
                .with_label_values(&["invalid_race_result"])
                .get(),
            3
        );
        assert_eq!(service.store().get_team_count().unwrap(), 0);
    }

    #[test]
    fn test_preview_does_not_persist() {
        let service = create_service(true);
        service.register_team("a", None).unwrap();

        let race_id = crate::utils::generate_race_id();
        let mut preview = submission(&["b", "a"]);
        preview.race_id = Some(race_id);

        let outcome = service.preview_race(preview).unwrap();
        assert!(!outcome.persisted);
        assert_eq!(outcome.race_id, race_id);
        assert_eq!(outcome.changes[0].delta, 16);

        assert_eq!(service.team_standing("a").unwrap().rating, 1500);
        assert!(service.team_standing("b").is_err());
    }

    #[test]
    fn test_blank_team_id_is_invalid_race() {
        for auto_register in [true, false] {
            let service = create_service(auto_register);

            for blank in ["", "  "] {
                let err = service
                    .record_race(submission(&[blank, "b"]))
                    .unwrap_err();
                assert!(matches!(
                    err.downcast_ref::<StandingsError>(),
                    Some(StandingsError::InvalidRaceResult { .. })
                ));
            }
            assert_eq!(service.store().get_team_count().unwrap(), 0);
        }
    }

    #[test]
    fn test_finisher_ids_are_trimmed() {
        let service = create_service(true);
        service.register_team("a", None).unwrap();

        let outcome = service.record_race(submission(&[" a ", "b"])).unwrap();
        assert_eq!(outcome.changes[0].team_id, "a");

        assert_eq!(service.store().get_team_count().unwrap(), 2);
        assert_eq!(service.team_standing("a").unwrap().rating, 1516);

        // Padded and plain ids name the same squadron
        let err = service.record_race(submission(&["b", " b"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StandingsError>(),
            Some(StandingsError::InvalidRaceResult { .. })
        ));
    }

    #[test]
    fn test_calculation_metrics() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let service = create_service(true).with_metrics(metrics.clone());

        service.preview_race(submission(&["a", "b"])).unwrap();
        assert_eq!(metrics.rating().races_recorded_total.get(), 0);
        assert_eq!(
            metrics.rating().rating_calculation_duration.get_sample_count(),
            1
        );

        service.record_race(submission(&["a", "b"])).unwrap();
        assert_eq!(metrics.rating().races_recorded_total.get(), 1);
        assert_eq!(
            metrics.rating().rating_calculation_duration.get_sample_count(),
            2
        );
    }

    #[test]
    fn test_leaderboard_filters_and_limits() {
        let service = create_service(true);
        for _ in 0..12 {
            service.record_race(submission(&["a", "b", "c"])).unwrap();
        }

        let all = service.leaderboard(None, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].team_id, "a");
        assert!(all.windows(2).all(|w| w[0].rating >= w[1].rating));

        let top = service.leaderboard(None, Some(1)).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].team_id, "a");

        let open = service.leaderboard(Some(DivisionTier::Open), None).unwrap();
        assert!(open.iter().all(|v| v.division == DivisionTier::Open));
        assert_eq!(open.last().unwrap().team_id, "c");
        assert_eq!(open.last().unwrap().rank, 3);
    }

    #[test]
    fn test_qualification_and_divisions() {
        let service = create_service(false);
        service.register_team("a", None).unwrap();

        let check = service
            .check_qualification("a", DivisionTier::Pro, false)
            .unwrap();
        assert!(check.qualified);
        assert_eq!(check.current_division, DivisionTier::Pro);

        let check = service
            .check_qualification("a", DivisionTier::Open, true)
            .unwrap();
        assert!(check.qualified);

        let check = service
            .check_qualification("a", DivisionTier::Masters, true)
            .unwrap();
        assert!(!check.qualified);

        assert!(service
            .check_qualification("ghost", DivisionTier::Pro, true)
            .is_err());

        let summary = service.division_summary().unwrap();
        assert_eq!(summary.len(), 4);
        assert_eq!(summary[&DivisionTier::Pro], 1);
        assert_eq!(summary[&DivisionTier::Elite], 0);
    }

    #[test]
    fn test_remove_team() {
        let service = create_service(false);
        service.register_team("a", None).unwrap();

        service.remove_team("a").unwrap();
        assert!(service.team_standing("a").is_err());
        assert!(service.remove_team("a").is_err());
    }

    #[test]
    fn test_store_failure_is_reported() {
        let mut store = MockStandingsStore::new();
        store
            .expect_get_standings()
            .returning(|_| Ok(HashMap::new()));
        store
            .expect_store_standings()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("standings database unavailable")));

        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let service = StandingsService::new(
            Arc::new(EloRatingCalculator::default()),
            Arc::new(store),
            StandingsSettings::default(),
        )
        .with_metrics(metrics.clone());

        let err = service.record_race(submission(&["a", "b"])).unwrap_err();
        assert!(err.to_string().contains("unavailable"));
        assert_eq!(metrics.rating().races_recorded_total.get(), 0);
        assert_eq!(
            metrics
                .rating()
                .race_errors_total
                .with_label_values(&["internal_error"])
                .get(),
            1
        );
    }

    #[test]
    fn test_refresh_division_metrics() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let service = create_service(false).with_metrics(metrics.clone());
        service.register_team("a", None).unwrap();
        service.register_team("b", None).unwrap();

        service.refresh_division_metrics().unwrap();
        assert_eq!(
            metrics
                .rating()
                .teams_by_division
                .with_label_values(&["pro"])
                .get(),
            2
        );
    }
}
