//! Repository for the append-only `sensor_samples` table.

use lathe_core::process::Reading;
use lathe_core::types::{JobId, Timestamp};
use sqlx::PgPool;

use crate::models::sensor::SensorSample;

const COLUMNS: &str = "\
    machine_id, job_id, recorded_at, air_temperature, process_temperature, \
    rotational_speed, torque, tool_wear, failure_probability";

#[derive(Debug, sqlx::FromRow)]
struct SampleRow {
    machine_id: String,
    job_id: JobId,
    recorded_at: Timestamp,
    air_temperature: f64,
    process_temperature: f64,
    rotational_speed: f64,
    torque: f64,
    tool_wear: f64,
    failure_probability: f64,
}

impl From<SampleRow> for SensorSample {
    fn from(row: SampleRow) -> Self {
        SensorSample {
            machine_id: row.machine_id,
            job_id: row.job_id,
            timestamp: row.recorded_at,
            reading: Reading {
                air_temperature: row.air_temperature,
                process_temperature: row.process_temperature,
                rotational_speed: row.rotational_speed,
                torque: row.torque,
                tool_wear: row.tool_wear,
            },
            failure_probability: row.failure_probability,
        }
    }
}

pub struct SensorSampleRepo;

impl SensorSampleRepo {
    pub async fn insert(pool: &PgPool, sample: &SensorSample) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sensor_samples (machine_id, job_id, recorded_at, air_temperature, \
                 process_temperature, rotational_speed, torque, tool_wear, failure_probability) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&sample.machine_id)
        .bind(sample.job_id)
        .bind(sample.timestamp)
        .bind(sample.reading.air_temperature)
        .bind(sample.reading.process_temperature)
        .bind(sample.reading.rotational_speed)
        .bind(sample.reading.torque)
        .bind(sample.reading.tool_wear)
        .bind(sample.failure_probability)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn latest_for_machine(
        pool: &PgPool,
        machine_id: &str,
    ) -> Result<Option<SensorSample>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_samples WHERE machine_id = $1 \
             ORDER BY recorded_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, SampleRow>(&query)
            .bind(machine_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(SensorSample::from))
    }

    pub async fn latest_for_job(
        pool: &PgPool,
        job_id: JobId,
    ) -> Result<Option<SensorSample>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_samples WHERE job_id = $1 \
             ORDER BY recorded_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, SampleRow>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(SensorSample::from))
    }

    /// Samples of a job in time order, optionally bounded on either side.
    pub async fn list_for_job(
        pool: &PgPool,
        job_id: JobId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<SensorSample>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_samples \
             WHERE job_id = $1 \
               AND ($2::timestamptz IS NULL OR recorded_at >= $2) \
               AND ($3::timestamptz IS NULL OR recorded_at <= $3) \
             ORDER BY recorded_at ASC"
        );
        let rows = sqlx::query_as::<_, SampleRow>(&query)
            .bind(job_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(SensorSample::from).collect())
    }

    pub async fn count_for_job(pool: &PgPool, job_id: JobId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sensor_samples WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(pool)
            .await
    }
}
