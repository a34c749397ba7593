//! Performance benchmarks for rating calculations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use karteando_standings::config::StandingsSettings;
use karteando_standings::rating::{
    compute_race_rating_changes, EloRatingCalculator, InMemoryStandingsStore, RatingCalculator,
};
use karteando_standings::standings::StandingsService;
use karteando_standings::types::{RaceFinisher, RaceResult, RaceSubmission};
use std::sync::Arc;

fn race_results(size: usize) -> Vec<RaceResult> {
    (0..size)
        .map(|i| {
            RaceResult::new(
                format!("squadron_{}", i),
                1300 + (i as i32 * 37) % 700,
                i as u32 + 1,
            )
        })
        .collect()
}

fn race_submission(size: usize, offset: usize) -> RaceSubmission {
    RaceSubmission {
        race_id: None,
        finishers: (0..size)
            .map(|i| RaceFinisher {
                team_id: format!("squadron_{}", (i + offset) % size),
                finish_position: i as u32 + 1,
            })
            .collect(),
    }
}

fn bench_rating_calculations(c: &mut Criterion) {
    let calculator = EloRatingCalculator::default();
    let mut group = c.benchmark_group("race_rating_changes");

    for size in [4usize, 8, 12, 20] {
        let results = race_results(size);

        group.bench_with_input(BenchmarkId::new("engine", size), &results, |b, results| {
            b.iter(|| black_box(compute_race_rating_changes(results)))
        });
        group.bench_with_input(
            BenchmarkId::new("calculator", size),
            &results,
            |b, results| b.iter(|| black_box(calculator.calculate_race(results))),
        );
    }

    group.finish();
}

fn bench_record_race(c: &mut Criterion) {
    let service = StandingsService::new(
        Arc::new(EloRatingCalculator::default()),
        Arc::new(InMemoryStandingsStore::new()),
        StandingsSettings::default(),
    );

    let mut offset = 0;
    c.bench_function("record_race_12_squadrons", |b| {
        b.iter(|| {
            offset += 1;
            black_box(service.record_race(race_submission(12, offset)))
        })
    });
}

fn bench_leaderboard(c: &mut Criterion) {
    let service = StandingsService::new(
        Arc::new(EloRatingCalculator::default()),
        Arc::new(InMemoryStandingsStore::new()),
        StandingsSettings::default(),
    );

    // Build up a populated table first
    for race in 0..50 {
        let _ = service.record_race(race_submission(20, race));
    }

    c.bench_function("leaderboard_20_squadrons", |b| {
        b.iter(|| black_box(service.leaderboard(None, Some(10))))
    });
}

criterion_group!(
    benches,
    bench_rating_calculations,
    bench_record_race,
    bench_leaderboard
);
criterion_main!(benches);
