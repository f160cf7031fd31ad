//! In-process store used when no database is configured, and by tests.
//!
//! All state sits behind a single `RwLock` so that the ongoing-job check in
//! [`JobStore::insert_job`] and the insert itself happen under one write
//! guard.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use lathe_core::alert::{AlertStatus, SEVERITY_CRITICAL};
use lathe_core::job::{JobCompletion, JobStatus};
use lathe_core::types::{JobId, Timestamp};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::alert::{Alert, NewAlert};
use crate::models::job::Job;
use crate::models::sensor::SensorSample;
use crate::store::{AlertStore, JobStore, SensorStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    /// Samples per job in append order.
    samples: HashMap<JobId, Vec<SensorSample>>,
    alerts: Vec<Alert>,
}

/// Memory-backed implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(format!("Job {} already exists", job.id)));
        }
        if job.status == JobStatus::Ongoing
            && tables
                .jobs
                .values()
                .any(|j| j.machine_id == job.machine_id && j.status == JobStatus::Ongoing)
        {
            return Err(StoreError::Conflict(format!(
                "Machine {} already has an ongoing job",
                job.machine_id
            )));
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn upsert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.jobs.entry(job.id).or_insert_with(|| job.clone());
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn find_ongoing_job(&self, machine_id: &str) -> Result<Option<Job>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .find(|j| j.machine_id == machine_id && j.status == JobStatus::Ongoing)
            .cloned())
    }

    async fn list_ongoing_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Ongoing)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(jobs)
    }

    async fn list_jobs(&self, machine_id: &str) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.machine_id == machine_id)
            .cloned()
            .collect();
        newest_first(&mut jobs);
        Ok(jobs)
    }

    async fn mark_status(
        &self,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .jobs
            .get_mut(&id)
            .is_some_and(|job| job.apply_completion(completion)))
    }
}

#[async_trait]
impl SensorStore for MemoryStore {
    async fn append_sample(&self, sample: &SensorSample) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(&sample.job_id) {
            return Err(StoreError::NotFound(format!("Job {}", sample.job_id)));
        }
        tables
            .samples
            .entry(sample.job_id)
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    async fn latest_for_machine(
        &self,
        machine_id: &str,
    ) -> Result<Option<SensorSample>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .samples
            .values()
            .flatten()
            .filter(|s| s.machine_id == machine_id)
            .max_by_key(|s| s.timestamp)
            .cloned())
    }

    async fn latest_for_job(&self, job_id: JobId) -> Result<Option<SensorSample>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .samples
            .get(&job_id)
            .and_then(|v| v.iter().max_by_key(|s| s.timestamp))
            .cloned())
    }

    async fn samples_for_job(
        &self,
        job_id: JobId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<SensorSample>, StoreError> {
        let tables = self.tables.read().await;
        let mut samples: Vec<SensorSample> = tables
            .samples
            .get(&job_id)
            .map(|v| {
                v.iter()
                    .filter(|s| from.is_none_or(|f| s.timestamp >= f))
                    .filter(|s| to.is_none_or(|t| s.timestamp <= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    async fn count_for_job(&self, job_id: JobId) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.samples.get(&job_id).map_or(0, |v| v.len() as u64))
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, StoreError> {
        let row = Alert {
            id: Uuid::new_v4(),
            machine_id: alert.machine_id.clone(),
            job_id: alert.job_id,
            timestamp: Utc::now(),
            alert_type: alert.alert_type.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            status: AlertStatus::Active,
            requires_maintenance: alert.requires_maintenance,
            triggered_by: alert.triggered_by.clone(),
        };
        self.tables.write().await.alerts.push(row.clone());
        Ok(row)
    }

    async fn find_active_critical(&self, machine_id: &str) -> Result<Option<Alert>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .alerts
            .iter()
            .filter(|a| {
                a.machine_id == machine_id
                    && a.status == AlertStatus::Active
                    && a.severity == SEVERITY_CRITICAL
                    && a.requires_maintenance
            })
            .max_by_key(|a| a.timestamp)
            .cloned())
    }

    async fn list_alerts(&self, machine_id: &str) -> Result<Vec<Alert>, StoreError> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<Alert> = tables
            .alerts
            .iter()
            .filter(|a| a.machine_id == machine_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(alerts)
    }
}
