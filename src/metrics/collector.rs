//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the standings service using
//! Prometheus metrics.

use crate::types::DivisionTier;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the standings service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Race and rating metrics
    rating_metrics: RatingMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=healthy)
    pub health_status: IntGauge,

    /// HTTP requests by endpoint and status code
    pub http_requests_total: IntCounterVec,
}

/// Race and rating metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Races recorded into the standings
    pub races_recorded_total: IntCounter,

    /// Rejected or failed race submissions
    pub race_errors_total: IntCounterVec,

    /// Distribution of per-squadron rating deltas
    pub rating_delta: Histogram,

    /// Time spent computing rating changes
    pub rating_calculation_duration: Histogram,

    /// Registered squadrons per division
    pub teams_by_division: IntGaugeVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            rating_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get rating metrics
    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    /// Record a race that was persisted, with its deltas
    pub fn record_race(&self, deltas: &[i32], calculation_time: Duration) {
        self.rating_metrics.races_recorded_total.inc();

        for delta in deltas {
            self.rating_metrics.rating_delta.observe(*delta as f64);
        }

        self.record_rating_calculation(calculation_time);
    }

    /// Record rating calculation duration
    pub fn record_rating_calculation(&self, duration: Duration) {
        self.rating_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a rejected race submission
    pub fn record_race_error(&self, reason: &str) {
        self.rating_metrics
            .race_errors_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Replace the per-division squadron counts
    pub fn update_division_counts(&self, counts: &BTreeMap<DivisionTier, usize>) {
        for tier in DivisionTier::ALL {
            let count = counts.get(&tier).copied().unwrap_or(0);
            self.rating_metrics
                .teams_by_division
                .with_label_values(&[tier.as_label()])
                .set(count as i64);
        }
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, endpoint: &str, status: u16) {
        let status = status.to_string();
        self.service_metrics
            .http_requests_total
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    /// Start timing now
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("karteando_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "karteando_health_status",
            "Health status (0=unhealthy, 1=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("karteando_http_requests_total", "Total HTTP requests served"),
            &["endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            http_requests_total,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let races_recorded_total = IntCounter::new(
            "karteando_races_recorded_total",
            "Total races recorded into the standings",
        )?;
        registry.register(Box::new(races_recorded_total.clone()))?;

        let race_errors_total = IntCounterVec::new(
            Opts::new(
                "karteando_race_errors_total",
                "Total rejected or failed race submissions",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(race_errors_total.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new("karteando_rating_delta", "Per-squadron rating delta")
                .buckets(vec![-32.0, -24.0, -16.0, -8.0, 0.0, 8.0, 16.0, 24.0, 32.0]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "karteando_rating_calculation_seconds",
                "Time spent computing rating changes for a race",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        let teams_by_division = IntGaugeVec::new(
            Opts::new(
                "karteando_teams_by_division",
                "Registered squadrons per division",
            ),
            &["division"],
        )?;
        registry.register(Box::new(teams_by_division.clone()))?;

        Ok(Self {
            races_recorded_total,
            race_errors_total,
            rating_delta,
            rating_calculation_duration,
            teams_by_division,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
