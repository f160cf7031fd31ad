//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /{job_id}            -> detail
/// GET    /{job_id}/samples    -> samples
/// POST   /{job_id}/stop       -> stop
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{job_id}", get(jobs::detail))
        .route("/{job_id}/samples", get(jobs::samples))
        .route("/{job_id}/stop", post(jobs::stop))
}
