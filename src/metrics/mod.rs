//! Metrics and monitoring for the standings service
//!
//! This module provides Prometheus metrics collection for races, ratings and
//! the HTTP surface.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, RatingMetrics, ServiceMetrics};
