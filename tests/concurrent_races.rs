//! Concurrency tests for race submission
//!
//! Races are recorded from many tasks at once; every read-modify-write on
//! the standings must land without lost updates.

mod fixtures;

use futures::future::join_all;
use karteando_standings::rating::StandingsStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use fixtures::{create_service_with_store, submission, FlakyStandingsStore};

const SQUADRONS: [&str; 8] = [
    "falcons", "hawks", "owls", "ravens", "eagles", "kites", "swifts", "herons",
];

/// Rotating lineup of four squadrons for race `n`
fn lineup(n: usize) -> Vec<&'static str> {
    (0..4).map(|i| SQUADRONS[(n + i * 3) % SQUADRONS.len()]).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_race_submissions() {
    let store = Arc::new(FlakyStandingsStore::new());
    let service = Arc::new(create_service_with_store(store.clone(), true));
    let race_count = 64;

    let start = Instant::now();
    let handles = (0..race_count).map(|n| {
        let service = service.clone();
        tokio::task::spawn_blocking(move || service.record_race(submission(&lineup(n))))
    });

    let outcomes = join_all(handles).await;
    let elapsed = start.elapsed();

    let mut expected_races: HashMap<&str, u64> = HashMap::new();
    let mut expected_wins: HashMap<&str, u64> = HashMap::new();
    for n in 0..race_count {
        let order = lineup(n);
        *expected_wins.entry(order[0]).or_default() += 1;
        for team in order {
            *expected_races.entry(team).or_default() += 1;
        }
    }

    for outcome in outcomes {
        assert!(outcome.expect("task panicked").is_ok());
    }
    assert_eq!(store.batch_writes(), race_count);

    let standings = store.get_all_standings().unwrap();
    assert_eq!(standings.len(), SQUADRONS.len());

    for (team, entry) in &standings {
        assert_eq!(
            entry.races_completed,
            expected_races[team.as_str()],
            "lost race update for {}",
            team
        );
        assert_eq!(
            entry.wins,
            expected_wins.get(team.as_str()).copied().unwrap_or(0),
            "lost win for {}",
            team
        );
        assert!((800..=2500).contains(&entry.rating));
    }

    println!(
        "✅ Recorded {} concurrent races in {:.2}ms",
        race_count,
        elapsed.as_secs_f64() * 1000.0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_during_writes() {
    let store = Arc::new(FlakyStandingsStore::new());
    let service = Arc::new(create_service_with_store(store.clone(), true));

    let writers = (0..16).map(|n| {
        let service = service.clone();
        tokio::task::spawn_blocking(move || {
            service.record_race(submission(&lineup(n))).map(|_| ())
        })
    });
    let readers = (0..16).map(|_| {
        let service = service.clone();
        tokio::task::spawn_blocking(move || service.leaderboard(None, Some(5)).map(|_| ()))
    });

    let results = join_all(writers.chain(readers)).await;
    for result in results {
        assert!(result.expect("task panicked").is_ok());
    }

    let table = service.leaderboard(None, None).unwrap();
    let ranks: Vec<usize> = table.iter().map(|row| row.rank).collect();
    assert_eq!(ranks, (1..=SQUADRONS.len()).collect::<Vec<_>>());
    assert!(table.windows(2).all(|pair| pair[0].rating >= pair[1].rating));
}
