//! Handlers for a single machine.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lathe_core::types::MachineId;
use lathe_db::models::job::Job;
use lathe_db::models::sensor::SensorSample;
use serde::Serialize;

use super::known_machine;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MachineDetail {
    pub id: MachineId,
    pub is_on: bool,
    pub under_maintenance: bool,
    pub ongoing_job: Option<Job>,
    pub latest_sample: Option<SensorSample>,
}

/// GET /api/v1/machines/{machine_id}
pub async fn detail(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;

    let ongoing_job = state.stores.jobs.find_ongoing_job(&machine_id).await?;
    let latest_sample = state.stores.sensors.latest_for_machine(&machine_id).await?;
    let under_maintenance = state
        .maintenance
        .is_under_maintenance(&machine_id, Utc::now())
        .await;

    Ok(Json(DataResponse {
        data: MachineDetail {
            id: machine_id,
            is_on: ongoing_job.is_some(),
            under_maintenance,
            ongoing_job,
            latest_sample,
        },
    }))
}
