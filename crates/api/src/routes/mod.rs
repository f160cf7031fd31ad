pub mod fleet;
pub mod health;
pub mod jobs;
pub mod machines;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` request/response route tree.
///
/// Route hierarchy:
///
/// ```text
/// /fleet/status                                    dashboard snapshot (GET)
/// /fleet/reconcile                                 close stalled jobs (POST)
///
/// /machines/{machine_id}                           machine detail (GET)
/// /machines/{machine_id}/jobs                      history (GET), start (POST)
/// /machines/{machine_id}/alerts                    history (GET), submit (POST)
/// /machines/{machine_id}/alerts/critical           trigger critical alert (POST)
/// /machines/{machine_id}/alerts/status             alert status (GET)
/// /machines/{machine_id}/maintenance               schedule maintenance (POST)
///
/// /jobs/{job_id}                                   job detail (GET)
/// /jobs/{job_id}/samples                           sensor samples (GET)
/// /jobs/{job_id}/stop                              stop job (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/fleet", fleet::router())
        .nest("/machines", machines::router())
        .nest("/jobs", jobs::router())
}

/// Build the `/api/v1` server-sent event routes.
///
/// Mounted separately so the request timeout does not cut long-lived
/// streams.
///
/// ```text
/// /fleet/stream                                    fleet status (SSE)
/// /machines/{machine_id}/stream                    sensor readings (SSE)
/// /machines/{machine_id}/simulation-stream         simulation status (SSE)
/// ```
pub fn stream_routes() -> Router<AppState> {
    Router::new()
        .nest("/fleet", fleet::stream_router())
        .nest("/machines", machines::stream_router())
}
