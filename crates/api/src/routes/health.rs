use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `postgres` or `memory`.
    pub storage: &'static str,
    /// Whether the database is reachable. Absent for the memory store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_healthy: Option<bool>,
    /// Live simulation workers.
    pub active_jobs: usize,
    /// Open SSE subscriptions.
    pub stream_subscribers: usize,
}

/// GET /health -- returns service, storage and runtime health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => Some(lathe_db::health_check(pool).await.is_ok()),
        None => None,
    };

    let status = if db_healthy == Some(false) { "degraded" } else { "ok" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage: if state.pool.is_some() { "postgres" } else { "memory" },
        db_healthy,
        active_jobs: state.registry.active_count().await,
        stream_subscribers: state.streams.active(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
