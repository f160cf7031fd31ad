//! Route definitions for the `/fleet` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{fleet, streams};
use crate::state::AppState;

/// Routes mounted at `/fleet`.
///
/// ```text
/// GET    /status          -> status
/// POST   /reconcile       -> reconcile
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(fleet::status))
        .route("/reconcile", post(fleet::reconcile))
}

/// ```text
/// GET    /stream          -> streams::fleet
/// ```
pub fn stream_router() -> Router<AppState> {
    Router::new().route("/stream", get(streams::fleet))
}
