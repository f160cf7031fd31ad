/// Jobs are identified by a random UUID assigned when a start is accepted.
pub type JobId = uuid::Uuid;

/// Machine identifiers look like `LATHE-07`.
pub type MachineId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
