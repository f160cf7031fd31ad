//! Handler for scheduling maintenance windows.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{TimeDelta, Utc};
use lathe_core::job_events::EVENT_MAINTENANCE_SCHEDULED;
use lathe_core::maintenance::MaintenanceWindow;
use lathe_core::types::MachineId;
use lathe_events::LatheEvent;
use serde::Serialize;

use super::known_machine;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ScheduledMaintenance {
    pub machine_id: MachineId,
    #[serde(flatten)]
    pub window: MaintenanceWindow,
}

/// POST /api/v1/machines/{machine_id}/maintenance
///
/// Put the machine under maintenance from now for the configured window
/// length. Replaces any existing window.
pub async fn schedule(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;
    let length = TimeDelta::minutes(state.simulation.maintenance_window_minutes);
    let window = state
        .maintenance
        .schedule(&machine_id, Utc::now(), length)
        .await;

    state.event_bus.publish(
        LatheEvent::new(EVENT_MAINTENANCE_SCHEDULED)
            .for_machine(machine_id.clone())
            .with_payload(serde_json::json!({
                "start": window.start,
                "end": window.end,
            })),
    );
    tracing::info!(machine_id = %machine_id, end = %window.end, "Maintenance scheduled");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ScheduledMaintenance { machine_id, window },
        }),
    ))
}
