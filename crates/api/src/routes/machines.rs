//! Route definitions for the `/machines` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{alerts, jobs, machines, maintenance, streams};
use crate::state::AppState;

/// Routes mounted at `/machines`.
///
/// ```text
/// GET    /{machine_id}                    -> machines::detail
/// GET    /{machine_id}/jobs               -> jobs::history
/// POST   /{machine_id}/jobs               -> jobs::start
/// GET    /{machine_id}/alerts             -> alerts::list
/// POST   /{machine_id}/alerts             -> alerts::submit
/// POST   /{machine_id}/alerts/critical    -> alerts::critical
/// GET    /{machine_id}/alerts/status      -> alerts::status
/// POST   /{machine_id}/maintenance        -> maintenance::schedule
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{machine_id}", get(machines::detail))
        .route("/{machine_id}/jobs", get(jobs::history).post(jobs::start))
        .route("/{machine_id}/alerts", get(alerts::list).post(alerts::submit))
        .route("/{machine_id}/alerts/critical", post(alerts::critical))
        .route("/{machine_id}/alerts/status", get(alerts::status))
        .route("/{machine_id}/maintenance", post(maintenance::schedule))
}

/// ```text
/// GET    /{machine_id}/stream             -> streams::machine
/// GET    /{machine_id}/simulation-stream  -> streams::simulation
/// ```
pub fn stream_router() -> Router<AppState> {
    Router::new()
        .route("/{machine_id}/stream", get(streams::machine))
        .route("/{machine_id}/simulation-stream", get(streams::simulation))
}
