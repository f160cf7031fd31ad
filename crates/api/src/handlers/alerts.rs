//! Handlers for machine alerts.
//!
//! A critical alert is more than a record: it stops the machine's running
//! simulation first and only then persists the alert.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lathe_core::alert::{
    validate_alert_message, validate_severity, ALERT_TYPE_CRITICAL, ALERT_TYPE_GENERAL,
    SEVERITY_CRITICAL, SEVERITY_GENERAL,
};
use lathe_core::error::CoreError;
use lathe_core::job::JobStatus;
use lathe_core::job_events::{EVENT_ALERT_CREATED, EVENT_ALERT_CRITICAL};
use lathe_core::types::{JobId, MachineId};
use lathe_db::models::alert::{Alert, NewAlert};
use lathe_events::LatheEvent;
use serde::{Deserialize, Serialize};

use super::known_machine;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitAlert {
    pub message: String,
    /// Defaults to the general severity.
    pub severity: Option<i16>,
    pub job_id: Option<JobId>,
    pub operator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerCritical {
    pub message: String,
    pub operator_id: Option<String>,
}

/// Notification shown to operators after a critical alert.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalNotification {
    pub title: &'static str,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub requires_maintenance: bool,
}

#[derive(Debug, Serialize)]
pub struct CriticalAlertResult {
    pub alert: Alert,
    pub stopped_job_id: JobId,
    pub notification: CriticalNotification,
}

#[derive(Debug, Serialize)]
pub struct AlertStatusView {
    pub has_critical_alert: bool,
    pub alert_details: Option<Alert>,
    /// Status of the machine's most recent job, if any.
    pub job_status: Option<JobStatus>,
    pub requires_maintenance: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/machines/{machine_id}/alerts
///
/// Alert history, newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;
    let alerts = state.stores.alerts.list_alerts(&machine_id).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// POST /api/v1/machines/{machine_id}/alerts
pub async fn submit(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
    Json(input): Json<SubmitAlert>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;
    validate_alert_message(&input.message)?;
    let severity = input.severity.unwrap_or(SEVERITY_GENERAL);
    validate_severity(severity)?;

    let alert = state
        .stores
        .alerts
        .insert_alert(&NewAlert {
            machine_id: machine_id.clone(),
            job_id: input.job_id,
            alert_type: ALERT_TYPE_GENERAL.to_string(),
            severity,
            message: input.message.trim().to_string(),
            requires_maintenance: false,
            triggered_by: input.operator_id.clone(),
        })
        .await?;

    let mut event = LatheEvent::new(EVENT_ALERT_CREATED)
        .for_machine(machine_id.clone())
        .with_payload(serde_json::json!({
            "alert_id": alert.id,
            "severity": alert.severity,
        }));
    if let Some(operator) = input.operator_id {
        event = event.with_actor(operator);
    }
    state.event_bus.publish(event);

    tracing::info!(alert_id = %alert.id, machine_id = %machine_id, severity, "Alert submitted");
    Ok((StatusCode::CREATED, Json(DataResponse { data: alert })))
}

/// POST /api/v1/machines/{machine_id}/alerts/critical
///
/// Stop the machine's running simulation and record the operator's
/// message as a critical, maintenance-requiring alert against its job. 409
/// when the machine has no ongoing job or the job has no live worker.
pub async fn critical(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
    Json(input): Json<TriggerCritical>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;
    validate_alert_message(&input.message)?;
    let operator_id = input.operator_id;

    let job = state
        .stores
        .jobs
        .find_ongoing_job(&machine_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "No ongoing job found for this machine".into(),
            ))
        })?;

    if !state.registry.stop(job.id).await {
        return Err(AppError::Core(CoreError::Conflict(
            "No active simulation found to stop".into(),
        )));
    }

    let alert = state
        .stores
        .alerts
        .insert_alert(&NewAlert {
            machine_id: machine_id.clone(),
            job_id: Some(job.id),
            alert_type: ALERT_TYPE_CRITICAL.to_string(),
            severity: SEVERITY_CRITICAL,
            message: input.message.trim().to_string(),
            requires_maintenance: true,
            triggered_by: operator_id.clone(),
        })
        .await?;

    let mut event = LatheEvent::new(EVENT_ALERT_CRITICAL)
        .for_job(machine_id.clone(), job.id)
        .with_payload(serde_json::json!({ "alert_id": alert.id }));
    if let Some(operator) = operator_id {
        event = event.with_actor(operator);
    }
    state.event_bus.publish(event);

    tracing::warn!(
        alert_id = %alert.id,
        job_id = %job.id,
        machine_id = %machine_id,
        "Critical alert raised, simulation stopped"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CriticalAlertResult {
                notification: CriticalNotification {
                    title: "CRITICAL MACHINE FAILURE RISK",
                    message: format!(
                        "{machine_id} requires immediate maintenance. Failure probability exceeds 80%."
                    ),
                    kind: "critical",
                    requires_maintenance: true,
                },
                stopped_job_id: job.id,
                alert,
            },
        }),
    ))
}

/// GET /api/v1/machines/{machine_id}/alerts/status
pub async fn status(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    let machine_id = known_machine(&state, machine_id)?;

    let critical = state.stores.alerts.find_active_critical(&machine_id).await?;
    let job_status = state
        .stores
        .jobs
        .list_jobs(&machine_id)
        .await?
        .first()
        .map(|job| job.status);

    Ok(Json(DataResponse {
        data: AlertStatusView {
            has_critical_alert: critical.is_some(),
            requires_maintenance: critical.as_ref().is_some_and(|a| a.requires_maintenance),
            alert_details: critical,
            job_status,
        },
    }))
}
