//! HTTP API, health endpoints and Prometheus metrics
//!
//! Exposes the standings service over JSON using Axum. Every route shares
//! the application state; domain errors are mapped onto status codes by
//! [`ApiError`].

use crate::error::StandingsError;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::types::{DivisionTier, RaceSubmission};
use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Build the router with all API, health and metrics endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/teams", post(register_team_handler))
        .route(
            "/teams/{team_id}",
            get(team_handler).delete(remove_team_handler),
        )
        .route(
            "/teams/{team_id}/qualification",
            get(qualification_handler),
        )
        .route("/races", post(record_race_handler))
        .route("/races/preview", post(preview_race_handler))
        .route("/standings", get(standings_handler))
        .route("/divisions", get(divisions_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}

/// Error returned by API handlers
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.downcast_ref::<StandingsError>() {
            Some(StandingsError::InvalidRaceResult { .. })
            | Some(StandingsError::InvalidRequest { .. }) => StatusCode::BAD_REQUEST,
            Some(StandingsError::TeamNotFound { .. }) => StatusCode::NOT_FOUND,
            Some(StandingsError::TeamAlreadyExists { .. }) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Unwrap a JSON body, turning malformed payloads into a 400 with a JSON error
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(StandingsError::InvalidRequest {
            reason: rejection.body_text(),
        }
        .into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterTeamRequest {
    pub team_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StandingsQuery {
    pub division: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct QualificationQuery {
    pub tier: String,
    #[serde(default)]
    pub allow_lower: bool,
}

async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;
    state
        .metrics()
        .record_http_request(&endpoint, response.status().as_u16());
    response
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/health",
            "/ready",
            "/metrics",
            "/teams",
            "/teams/{team_id}",
            "/teams/{team_id}/qualification",
            "/races",
            "/races/preview",
            "/standings",
            "/divisions"
        ]
    }))
}

/// Lightweight health check endpoint handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let status = match HealthCheck::liveness_check(state.clone()).await {
        Ok(status) => status,
        Err(e) => {
            error!("Liveness check failed: {}", e);
            HealthStatus::Unhealthy
        }
    };
    let code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": state.config().service.name,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint handler
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match HealthCheck::readiness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Metrics endpoint requested");

    if let Err(e) = state.standings().refresh_division_metrics() {
        error!("Failed to refresh division gauges: {}", e);
    }

    let metric_families = state.metrics().registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

async fn register_team_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterTeamRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(payload)?;
    let entry = state
        .standings()
        .register_team(&request.team_id, request.name.as_deref())?;
    let view = state.standings().team_standing(&entry.team_id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn remove_team_handler(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.standings().remove_team(&team_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn team_handler(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.standings().team_standing(&team_id)?))
}

async fn qualification_handler(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<String>,
    Query(query): Query<QualificationQuery>,
) -> ApiResult<impl IntoResponse> {
    let tier: DivisionTier = query.tier.parse()?;
    let check = state
        .standings()
        .check_qualification(&team_id, tier, query.allow_lower)?;
    Ok(Json(check))
}

async fn record_race_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RaceSubmission>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let submission = json_body(payload)?;
    let outcome = state.standings().record_race(submission)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn preview_race_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RaceSubmission>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let submission = json_body(payload)?;
    Ok(Json(state.standings().preview_race(submission)?))
}

async fn standings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StandingsQuery>,
) -> ApiResult<impl IntoResponse> {
    let division = query
        .division
        .as_deref()
        .map(str::parse::<DivisionTier>)
        .transpose()?;
    Ok(Json(state.standings().leaderboard(division, query.limit)?))
}

async fn divisions_handler(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let summary = state.standings().division_summary()?;
    let divisions: Vec<_> = summary
        .iter()
        .rev()
        .map(|(tier, count)| {
            json!({
                "division": tier,
                "rank": tier.rank(),
                "teams": count
            })
        })
        .collect();
    Ok(Json(json!({ "divisions": divisions })))
}
