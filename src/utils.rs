//! Utility functions for the standings service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique race ID
pub fn generate_race_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round to the nearest integer, halves toward positive infinity
///
/// `-5.5` rounds to `-5` and `5.5` to `6`, matching the rounding used for
/// historical standings.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Arithmetic mean, `None` for an empty input
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
