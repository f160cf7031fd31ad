//! Sensor sample entity.

use lathe_core::process::Reading;
use lathe_core::types::{JobId, MachineId, Timestamp};
use serde::Serialize;

/// One simulated telemetry point. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    pub machine_id: MachineId,
    pub job_id: JobId,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub reading: Reading,
    pub failure_probability: f64,
}
