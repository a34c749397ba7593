//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the rating
//! calculator, standings store, metrics and HTTP server together and owns
//! the background tasks.

use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::rating::{EloRatingCalculator, InMemoryStandingsStore};
use crate::service::health::HealthCheck;
use crate::service::http::create_router;
use crate::standings::StandingsService;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Rating and standings coordination
    standings: Arc<StandingsService>,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    /// Periodic background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// HTTP server task, drained rather than aborted on shutdown
    server_task: Mutex<Option<JoinHandle<()>>>,

    /// Address the HTTP server is bound to
    local_addr: OnceLock<SocketAddr>,

    /// Signals the HTTP server to stop accepting connections
    shutdown_tx: broadcast::Sender<()>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing karteando standings service");
        info!(
            "Configuration: service={}, k_factor={}, bounds=[{}, {}], exclusion={:?}",
            config.service.name,
            config.rating.k_factor,
            config.rating.min_rating,
            config.rating.max_rating,
            config.rating.opponent_exclusion
        );

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let calculator = EloRatingCalculator::new(config.rating.clone()).map_err(|e| {
            ServiceError::Configuration {
                message: format!("Invalid rating configuration: {}", e),
            }
        })?;

        let standings = Arc::new(
            StandingsService::new(
                Arc::new(calculator),
                Arc::new(InMemoryStandingsStore::new()),
                config.standings.clone(),
            )
            .with_metrics(metrics.clone()),
        );

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            standings,
            metrics,
            background_tasks: Mutex::new(Vec::new()),
            server_task: Mutex::new(None),
            local_addr: OnceLock::new(),
            shutdown_tx,
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Bind the HTTP server and start background tasks
    pub async fn start(self: Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting karteando standings service");

        let addr: SocketAddr = format!(
            "{}:{}",
            self.config.service.http_host, self.config.service.http_port
        )
        .parse()
        .map_err(|e| ServiceError::Configuration {
            message: format!("Invalid HTTP address: {}", e),
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to bind {}: {}", addr, e),
            })?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to read bound address: {}", e),
            })?;
        let _ = self.local_addr.set(addr);

        self.set_running(true).await;

        let server_task = {
            let router = create_router(self.clone());
            let mut shutdown_rx = self.shutdown_tx.subscribe();

            tokio::spawn(async move {
                info!("HTTP server listening on http://{}", addr);
                let result = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.recv().await;
                        info!("HTTP server shutdown signal received");
                    })
                    .await;

                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => error!("HTTP server failed: {}", e),
                }
            })
        };

        *self.server_task.lock().await = Some(server_task);

        let mut tasks = self.background_tasks.lock().await;
        tasks.push(self.clone().spawn_division_refresh_task());
        tasks.push(self.clone().spawn_health_metrics_task());

        info!(
            "Karteando standings service started with {} background tasks",
            tasks.len()
        );
        Ok(())
    }

    /// Perform graceful shutdown
    ///
    /// Stops the periodic tasks and waits for the HTTP server to finish the
    /// requests it is serving. Callers bound the wait with a timeout.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of karteando standings service");

        self.set_running(false).await;

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }

        let mut tasks = self.background_tasks.lock().await;
        let task_count = tasks.len();
        for (i, task) in tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }
        drop(tasks);

        let server_task = self.server_task.lock().await.take();
        if let Some(server_task) = server_task {
            debug!("Waiting for HTTP server to drain in-flight requests");
            server_task
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("HTTP server task failed: {}", e),
                })?;
        }

        let team_count = self
            .standings
            .store()
            .get_team_count()
            .map_err(|e| ServiceError::BackgroundTask {
                message: format!("Failed to read final standings: {}", e),
            })?;

        info!(
            "Shutdown complete - {} background tasks stopped, {} squadrons in standings",
            task_count, team_count
        );
        Ok(())
    }

    /// Address the HTTP server is listening on, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the standings service
    pub fn standings(&self) -> Arc<StandingsService> {
        self.standings.clone()
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Mark the service as running or stopped
    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    fn spawn_division_refresh_task(self: Arc<Self>) -> JoinHandle<()> {
        let refresh_interval = self.config.division_refresh_interval();
        info!(
            "Starting division gauge refresh task ({}s interval)...",
            refresh_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh_interval);

            while self.is_running().await {
                interval.tick().await;

                match self.standings.refresh_division_metrics() {
                    Ok(()) => debug!("Division gauges refreshed"),
                    Err(e) => warn!("Failed to refresh division gauges: {}", e),
                }
            }

            info!("Division gauge refresh task stopped");
        })
    }

    fn spawn_health_metrics_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            let start_time = tokio::time::Instant::now();

            while self.is_running().await {
                interval.tick().await;

                let uptime_seconds = start_time.elapsed().as_secs() as i64;
                self.metrics.service().uptime_seconds.set(uptime_seconds);

                match HealthCheck::check(self.clone()).await {
                    Ok(health) => {
                        self.metrics.update_health_status(health.status.as_gauge());
                        debug!(
                            "Health metrics updated - status: {}, uptime: {}s",
                            health.status, uptime_seconds
                        );
                    }
                    Err(e) => warn!("Health check failed: {}", e),
                }
            }

            info!("Health metrics task stopped");
        })
    }
}
