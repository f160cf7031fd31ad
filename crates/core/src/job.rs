//! Job lifecycle rules: statuses, start parameters and stall detection.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::material::{JobType, Material};
use crate::process::round_to;
use crate::types::{MachineId, Timestamp};

/// Highest tool number accepted on a start request.
pub const MAX_TOOL_NUMBER: u32 = 50;

/// Longest job accepted on a start request (24 hours).
pub const MAX_ESTIMATED_MINUTES: f64 = 1440.0;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Job lifecycle status.
///
/// Transitions are monotone: `Ongoing` may move to `Completed` or `Failed`;
/// terminal statuses never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ongoing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Ongoing => "ongoing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Ongoing)
    }

    /// Whether a job in `self` may move to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Ongoing, JobStatus::Completed) | (JobStatus::Ongoing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(JobStatus::Ongoing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CoreError::Validation(format!("Unknown job status: '{other}'"))),
        }
    }
}

/// Terminal state written when a job closes.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCompletion {
    pub status: JobStatus,
    pub end_time: Timestamp,
    /// Minutes, rounded to 2 decimals.
    pub actual_duration: f64,
    pub error: Option<String>,
}

impl JobCompletion {
    pub fn completed(end_time: Timestamp, actual_duration: f64) -> Self {
        Self {
            status: JobStatus::Completed,
            end_time,
            actual_duration,
            error: None,
        }
    }

    pub fn failed(end_time: Timestamp, actual_duration: f64, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            end_time,
            actual_duration,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Start parameters
// ---------------------------------------------------------------------------

/// Validated parameters of a job-start request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct JobParams {
    #[serde(default)]
    pub machine_id: MachineId,
    pub job_type: JobType,
    pub material: Material,
    #[validate(range(min = 1, max = 50))]
    pub tool_number: u32,
    #[validate(range(exclusive_min = 0.0, max = 1440.0))]
    pub estimated_minutes: f64,
    #[validate(length(min = 1, max = 128))]
    pub operator_id: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

impl JobParams {
    /// Run field validation and the simulation-specific checks.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if !self.estimated_minutes.is_finite() {
            return Err(CoreError::Validation(
                "estimated_minutes must be finite".to_string(),
            ));
        }
        self.material.require_profile()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Timing helpers
// ---------------------------------------------------------------------------

/// Minutes between `start` and `now`, rounded to 2 decimals and never
/// negative.
pub fn elapsed_minutes(start: Timestamp, now: Timestamp) -> f64 {
    let millis = (now - start).num_milliseconds().max(0);
    round_to(millis as f64 / 60_000.0, 2)
}

/// When a job started at `start` is expected to finish.
pub fn expected_end(start: Timestamp, estimated_minutes: f64) -> Timestamp {
    let millis = (estimated_minutes.max(0.0) * 60_000.0).round() as i64;
    start + TimeDelta::milliseconds(millis)
}

/// Whether an `ongoing` job has outlived its estimate at `now`.
pub fn is_stalled(start: Timestamp, estimated_minutes: f64, now: Timestamp) -> bool {
    expected_end(start, estimated_minutes) < now
}
