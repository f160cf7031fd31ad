//! Handlers for the fleet-wide dashboard.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::live::snapshot;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReconcileResult {
    /// Jobs closed by this sweep.
    pub closed: usize,
}

/// GET /api/v1/fleet/status
///
/// On/off and maintenance state of every machine. Stalled jobs are closed
/// first so a machine whose job has long overrun is not reported as on.
pub async fn status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    state.registry.reconcile_stalled(Utc::now()).await?;
    let snap = snapshot::fleet(&state.stores, &state.maintenance, state.fleet).await?;
    Ok(Json(DataResponse { data: snap }))
}

/// POST /api/v1/fleet/reconcile
pub async fn reconcile(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let closed = state.registry.reconcile_stalled(Utc::now()).await?;
    tracing::info!(closed, "On-demand stall reconciliation");
    Ok(Json(DataResponse {
        data: ReconcileResult { closed },
    }))
}
