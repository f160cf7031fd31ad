//! Handlers for starting, inspecting and stopping jobs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lathe_core::error::CoreError;
use lathe_core::job::JobParams;
use lathe_core::types::{JobId, MachineId, Timestamp};
use lathe_db::models::job::Job;
use serde::{Deserialize, Serialize};

use super::known_machine;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Optional inclusive time bounds for `GET /jobs/{job_id}/samples`.
#[derive(Debug, Default, Deserialize)]
pub struct SampleRange {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
pub struct StopAccepted {
    pub job_id: JobId,
    pub stopping: bool,
}

async fn find_job(state: &AppState, job_id: JobId) -> AppResult<Job> {
    state
        .stores
        .jobs
        .find_job(job_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            })
        })
}

/// POST /api/v1/machines/{machine_id}/jobs
///
/// Start a simulated job. The machine id comes from the path and overrides
/// any value in the body. Returns 201 with the created job, 409 when the
/// machine is already running one.
pub async fn start(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
    Json(mut params): Json<JobParams>,
) -> AppResult<impl IntoResponse> {
    params.machine_id = machine_id;
    let job = state.registry.start(params).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /api/v1/machines/{machine_id}/jobs
///
/// Job history of a machine, newest first.
pub async fn history(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;
    let jobs = state.stores.jobs.list_jobs(&machine_id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{job_id}
pub async fn detail(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/jobs/{job_id}/samples?from=&to=
///
/// Samples of a job in ascending timestamp order.
pub async fn samples(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(range): Query<SampleRange>,
) -> AppResult<impl IntoResponse> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(AppError::BadRequest(
                "'from' must not be later than 'to'".into(),
            ));
        }
    }
    find_job(&state, job_id).await?;

    let samples = state
        .stores
        .sensors
        .samples_for_job(job_id, range.from, range.to)
        .await?;
    Ok(Json(DataResponse { data: samples }))
}

/// POST /api/v1/jobs/{job_id}/stop
///
/// Ask the job's worker to stop. Returns 202; the job is closed as
/// `completed` by its worker shortly after. 404 for an unknown job, 409
/// when the job has no live worker.
pub async fn stop(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    if !state.registry.stop(job_id).await {
        let job = find_job(&state, job_id).await?;
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Job {} is not running (status: {})",
            job.id, job.status
        ))));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: StopAccepted {
                job_id,
                stopping: true,
            },
        }),
    ))
}
