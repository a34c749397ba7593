//! Rating Preview CLI Tool
//!
//! Offline calculator that rates a single race without a running service.
//!
//! Usage:
//!   cargo run --bin rating-preview -- race.json
//!   cat race.json | cargo run --bin rating-preview -- --json
//!   cargo run --bin rating-preview -- race.json --k-factor 24 --exclusion by_position
//!
//! The input is a JSON array of race results:
//!   [{"team_id": "falcons", "rating_before": 1500, "finish_position": 1}, ...]

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use karteando_standings::rating::{
    classify_division, EloConfig, EloRatingCalculator, OpponentExclusion, RatingCalculator,
};
use karteando_standings::types::RaceResult;

#[derive(Parser)]
#[command(name = "rating-preview")]
#[command(about = "Preview ELO rating changes for a finished go-kart race")]
struct Cli {
    /// JSON file with the race results (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Print the changes as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// K-factor override
    #[arg(short, long)]
    k_factor: Option<f64>,

    /// Opponent exclusion mode (by_value or by_position)
    #[arg(short, long)]
    exclusion: Option<OpponentExclusion>,
}

fn read_results(input: Option<&PathBuf>) -> Result<Vec<RaceResult>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read race results from stdin")?;
            buffer
        }
    };

    serde_json::from_str(&raw).context("Race results must be a JSON array of results")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EloConfig::default();
    if let Some(k_factor) = cli.k_factor {
        config.k_factor = k_factor;
    }
    if let Some(exclusion) = cli.exclusion {
        config.opponent_exclusion = exclusion;
    }

    let calculator = EloRatingCalculator::new(config)?;
    let results = read_results(cli.input.as_ref())?;
    let calculation = calculator.calculate_race(&results)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&calculation)?);
        return Ok(());
    }

    println!(
        "🏁 Race with {} squadrons (field average {:.1})",
        calculation.changes.len(),
        calculation.field_average
    );
    println!(
        "{:<4} {:<20} {:>7} {:>7} {:>6} {:>9}  {}",
        "POS", "SQUADRON", "BEFORE", "AFTER", "DELTA", "OPP AVG", "DIVISION"
    );

    let mut changes = calculation.changes;
    changes.sort_by_key(|change| change.finish_position);
    for change in &changes {
        let before = classify_division(change.rating_before);
        let after = classify_division(change.rating_after);
        let division = if before == after {
            after.to_string()
        } else {
            format!("{} -> {}", before, after)
        };

        println!(
            "P{:<3} {:<20} {:>7} {:>7} {:>+6} {:>9.1}  {}",
            change.finish_position,
            change.team_id,
            change.rating_before,
            change.rating_after,
            change.delta,
            change.opponent_average_rating,
            division
        );
    }

    Ok(())
}
