//! Repository for the `jobs` table.

use lathe_core::error::CoreError;
use lathe_core::job::{JobCompletion, JobStatus};
use lathe_core::types::{JobId, Timestamp};
use sqlx::PgPool;

use crate::models::job::Job;
use crate::store::StoreError;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, machine_id, job_type, material, tool_number, operator_id, description, \
    start_time, estimated_minutes, status, actual_duration, end_time, error_message";

/// Postgres error code for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Raw `jobs` row; enum columns are stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub machine_id: String,
    pub job_type: String,
    pub material: String,
    pub tool_number: i32,
    pub operator_id: String,
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub estimated_minutes: f64,
    pub status: String,
    pub actual_duration: Option<f64>,
    pub end_time: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: CoreError| StoreError::Corrupt(format!("job {id}: {e}"));
        Ok(Job {
            id,
            job_type: row.job_type.parse().map_err(corrupt)?,
            material: row.material.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            tool_number: u32::try_from(row.tool_number)
                .map_err(|_| StoreError::Corrupt(format!("job {id}: negative tool number")))?,
            machine_id: row.machine_id,
            operator_id: row.operator_id,
            description: row.description,
            start_time: row.start_time,
            estimated_minutes: row.estimated_minutes,
            actual_duration: row.actual_duration,
            end_time: row.end_time,
            error_message: row.error_message,
        })
    }
}

fn into_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, StoreError> {
    rows.into_iter().map(Job::try_from).collect()
}

/// Provides persistence operations for simulated jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a job. The partial unique index on ongoing jobs turns a second
    /// ongoing job for the same machine into [`StoreError::Conflict`].
    pub async fn insert(pool: &PgPool, job: &Job) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO jobs (id, machine_id, job_type, material, tool_number, operator_id, \
                 description, start_time, estimated_minutes, status, actual_duration, end_time, \
                 error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(job.id)
        .bind(&job.machine_id)
        .bind(job.job_type.as_str())
        .bind(job.material.as_str())
        .bind(job.tool_number as i32)
        .bind(&job.operator_id)
        .bind(&job.description)
        .bind(job.start_time)
        .bind(job.estimated_minutes)
        .bind(job.status.as_str())
        .bind(job.actual_duration)
        .bind(job.end_time)
        .bind(&job.error_message)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(StoreError::Conflict(format!(
                    "Machine {} already has an ongoing job",
                    job.machine_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a job unless its id already exists.
    pub async fn upsert(pool: &PgPool, job: &Job) -> Result<(), StoreError> {
        if Self::find_by_id(pool, job.id).await?.is_some() {
            return Ok(());
        }
        match Self::insert(pool, job).await {
            Err(StoreError::Conflict(_)) if Self::find_by_id(pool, job.id).await?.is_some() => {
                Ok(())
            }
            other => other,
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    pub async fn find_ongoing(pool: &PgPool, machine_id: &str) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE machine_id = $1 AND status = $2");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(machine_id)
            .bind(JobStatus::Ongoing.as_str())
            .fetch_optional(pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    pub async fn list_ongoing(pool: &PgPool) -> Result<Vec<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE status = $1 ORDER BY start_time ASC");
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(JobStatus::Ongoing.as_str())
            .fetch_all(pool)
            .await?;
        into_jobs(rows)
    }

    /// Job history of a machine, newest first.
    pub async fn list_for_machine(pool: &PgPool, machine_id: &str) -> Result<Vec<Job>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE machine_id = $1 ORDER BY start_time DESC"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(machine_id)
            .fetch_all(pool)
            .await?;
        into_jobs(rows)
    }

    /// Write the terminal state of an ongoing job.
    ///
    /// Returns `true` if the job was transitioned, `false` if it was already
    /// terminal (or does not exist).
    pub async fn mark_status(
        pool: &PgPool,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = $2, end_time = $3, actual_duration = $4, error_message = $5 \
             WHERE id = $1 AND status = $6",
        )
        .bind(id)
        .bind(completion.status.as_str())
        .bind(completion.end_time)
        .bind(completion.actual_duration)
        .bind(&completion.error)
        .bind(JobStatus::Ongoing.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
