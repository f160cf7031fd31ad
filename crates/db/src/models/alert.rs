//! Alert entity and creation DTO.

use lathe_core::alert::AlertStatus;
use lathe_core::types::{JobId, MachineId, Timestamp};
use serde::Serialize;
use uuid::Uuid;

/// A maintenance-relevant event raised against a machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub machine_id: MachineId,
    pub job_id: Option<JobId>,
    pub timestamp: Timestamp,
    pub alert_type: String,
    pub severity: i16,
    pub message: String,
    pub status: AlertStatus,
    pub requires_maintenance: bool,
    pub triggered_by: Option<String>,
}

/// Fields supplied when inserting an alert; id, timestamp and status are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub machine_id: MachineId,
    pub job_id: Option<JobId>,
    pub alert_type: String,
    pub severity: i16,
    pub message: String,
    pub requires_maintenance: bool,
    pub triggered_by: Option<String>,
}
