//! PostgreSQL repositories and the [`PgStore`] adapter that exposes them
//! through the store traits.

use async_trait::async_trait;
use lathe_core::job::JobCompletion;
use lathe_core::types::{JobId, Timestamp};

use crate::models::alert::{Alert, NewAlert};
use crate::models::job::Job;
use crate::models::sensor::SensorSample;
use crate::store::{AlertStore, JobStore, SensorStore, StoreError};
use crate::DbPool;

pub mod alert_repo;
pub mod job_repo;
pub mod sensor_sample_repo;

pub use alert_repo::AlertRepo;
pub use job_repo::JobRepo;
pub use sensor_sample_repo::SensorSampleRepo;

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        JobRepo::insert(&self.pool, job).await
    }

    async fn upsert_job(&self, job: &Job) -> Result<(), StoreError> {
        JobRepo::upsert(&self.pool, job).await
    }

    async fn find_job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        JobRepo::find_by_id(&self.pool, id).await
    }

    async fn find_ongoing_job(&self, machine_id: &str) -> Result<Option<Job>, StoreError> {
        JobRepo::find_ongoing(&self.pool, machine_id).await
    }

    async fn list_ongoing_jobs(&self) -> Result<Vec<Job>, StoreError> {
        JobRepo::list_ongoing(&self.pool).await
    }

    async fn list_jobs(&self, machine_id: &str) -> Result<Vec<Job>, StoreError> {
        JobRepo::list_for_machine(&self.pool, machine_id).await
    }

    async fn mark_status(
        &self,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, StoreError> {
        JobRepo::mark_status(&self.pool, id, completion).await
    }
}

#[async_trait]
impl SensorStore for PgStore {
    async fn append_sample(&self, sample: &SensorSample) -> Result<(), StoreError> {
        Ok(SensorSampleRepo::insert(&self.pool, sample).await?)
    }

    async fn latest_for_machine(
        &self,
        machine_id: &str,
    ) -> Result<Option<SensorSample>, StoreError> {
        Ok(SensorSampleRepo::latest_for_machine(&self.pool, machine_id).await?)
    }

    async fn latest_for_job(&self, job_id: JobId) -> Result<Option<SensorSample>, StoreError> {
        Ok(SensorSampleRepo::latest_for_job(&self.pool, job_id).await?)
    }

    async fn samples_for_job(
        &self,
        job_id: JobId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<SensorSample>, StoreError> {
        Ok(SensorSampleRepo::list_for_job(&self.pool, job_id, from, to).await?)
    }

    async fn count_for_job(&self, job_id: JobId) -> Result<u64, StoreError> {
        let count = SensorSampleRepo::count_for_job(&self.pool, job_id).await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, StoreError> {
        AlertRepo::insert(&self.pool, alert).await
    }

    async fn find_active_critical(&self, machine_id: &str) -> Result<Option<Alert>, StoreError> {
        AlertRepo::find_active_critical(&self.pool, machine_id).await
    }

    async fn list_alerts(&self, machine_id: &str) -> Result<Vec<Alert>, StoreError> {
        AlertRepo::list_for_machine(&self.pool, machine_id).await
    }
}
