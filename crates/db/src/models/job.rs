//! Job entity.

use lathe_core::job::{JobCompletion, JobParams, JobStatus};
use lathe_core::material::{JobType, Material};
use lathe_core::types::{JobId, MachineId, Timestamp};
use serde::Serialize;

/// One machining run on one machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub machine_id: MachineId,
    pub job_type: JobType,
    pub material: Material,
    pub tool_number: u32,
    pub operator_id: String,
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub estimated_minutes: f64,
    pub status: JobStatus,
    /// Minutes, set on the terminal transition.
    pub actual_duration: Option<f64>,
    pub end_time: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl Job {
    /// A freshly accepted job in `ongoing` status.
    pub fn new_ongoing(id: JobId, params: &JobParams, start_time: Timestamp) -> Self {
        Self {
            id,
            machine_id: params.machine_id.clone(),
            job_type: params.job_type,
            material: params.material,
            tool_number: params.tool_number,
            operator_id: params.operator_id.clone(),
            description: params.description.clone(),
            start_time,
            estimated_minutes: params.estimated_minutes,
            status: JobStatus::Ongoing,
            actual_duration: None,
            end_time: None,
            error_message: None,
        }
    }

    /// Apply a terminal transition in place. Returns `false` (and leaves the
    /// job untouched) when the job is already terminal.
    pub fn apply_completion(&mut self, completion: &JobCompletion) -> bool {
        if !self.status.can_transition_to(completion.status) {
            return false;
        }
        self.status = completion.status;
        self.end_time = Some(completion.end_time);
        self.actual_duration = Some(completion.actual_duration);
        self.error_message = completion.error.clone();
        true
    }
}
