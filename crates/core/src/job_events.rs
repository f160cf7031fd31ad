//! Event type names published on the lifecycle event bus.

/// A job was accepted and its worker spawned.
pub const EVENT_JOB_STARTED: &str = "job.started";

/// A job reached `completed` through its worker.
pub const EVENT_JOB_COMPLETED: &str = "job.completed";

/// A job reached `failed` through its worker.
pub const EVENT_JOB_FAILED: &str = "job.failed";

/// A stop signal was delivered to a live worker.
pub const EVENT_JOB_STOP_REQUESTED: &str = "job.stop_requested";

/// A stalled job was closed by reconciliation.
pub const EVENT_JOB_RECONCILED: &str = "job.reconciled";

/// An operator submitted an alert.
pub const EVENT_ALERT_CREATED: &str = "alert.created";

/// A critical alert halted a machine.
pub const EVENT_ALERT_CRITICAL: &str = "alert.critical";

/// A maintenance window was scheduled.
pub const EVENT_MAINTENANCE_SCHEDULED: &str = "maintenance.scheduled";
