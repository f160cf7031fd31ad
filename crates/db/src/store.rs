//! Storage collaborator traits consumed by the simulation core.
//!
//! Implementations own their concurrency safety: callers may issue reads
//! and writes from any number of tasks without application-level locking.

use std::sync::Arc;

use async_trait::async_trait;
use lathe_core::job::JobCompletion;
use lathe_core::types::{JobId, Timestamp};

use crate::memory::MemoryStore;
use crate::models::alert::{Alert, NewAlert};
use crate::models::job::Job;
use crate::models::sensor::SensorSample;
use crate::repositories::PgStore;
use crate::DbPool;

/// Errors surfaced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (e.g. a second ongoing job).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored value could not be mapped back into the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The backend is temporarily unavailable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `ongoing` job. Fails with [`StoreError::Conflict`] when
    /// the machine already has an ongoing job; the check and the insert are
    /// atomic.
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Insert `job` unless a job with the same id already exists.
    async fn upsert_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn find_job(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    async fn find_ongoing_job(&self, machine_id: &str) -> Result<Option<Job>, StoreError>;

    async fn list_ongoing_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// All jobs of a machine, newest first.
    async fn list_jobs(&self, machine_id: &str) -> Result<Vec<Job>, StoreError>;

    /// Move an `ongoing` job to its terminal state.
    ///
    /// Returns `true` if the transition happened and `false` if the job was
    /// already terminal (or unknown). Never reopens a job.
    async fn mark_status(&self, id: JobId, completion: &JobCompletion)
        -> Result<bool, StoreError>;
}

/// Append-only sensor telemetry.
#[async_trait]
pub trait SensorStore: Send + Sync {
    async fn append_sample(&self, sample: &SensorSample) -> Result<(), StoreError>;

    async fn latest_for_machine(&self, machine_id: &str)
        -> Result<Option<SensorSample>, StoreError>;

    async fn latest_for_job(&self, job_id: JobId) -> Result<Option<SensorSample>, StoreError>;

    /// Samples of a job in ascending timestamp order, optionally bounded
    /// (inclusive) on either side.
    async fn samples_for_job(
        &self,
        job_id: JobId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<SensorSample>, StoreError>;

    async fn count_for_job(&self, job_id: JobId) -> Result<u64, StoreError>;
}

/// Maintenance alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, StoreError>;

    /// Most recent active, maintenance-requiring alert of critical
    /// severity for a machine.
    async fn find_active_critical(&self, machine_id: &str) -> Result<Option<Alert>, StoreError>;

    /// All alerts of a machine, newest first.
    async fn list_alerts(&self, machine_id: &str) -> Result<Vec<Alert>, StoreError>;
}

/// The three store handles, cheaply cloneable.
#[derive(Clone)]
pub struct Stores {
    pub jobs: Arc<dyn JobStore>,
    pub sensors: Arc<dyn SensorStore>,
    pub alerts: Arc<dyn AlertStore>,
}

impl Stores {
    /// All three stores backed by one PostgreSQL pool.
    pub fn postgres(pool: DbPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            jobs: store.clone(),
            sensors: store.clone(),
            alerts: store,
        }
    }

    /// All three stores backed by one shared in-memory store.
    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    /// Wrap an existing memory store so callers can keep a typed handle.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            jobs: store.clone(),
            sensors: store.clone(),
            alerts: store,
        }
    }
}
