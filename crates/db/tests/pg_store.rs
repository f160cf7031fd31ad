//! Integration tests against a real database. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use assert_matches::assert_matches;
use chrono::{TimeDelta, Utc};
use lathe_core::job::{JobCompletion, JobParams, JobStatus};
use lathe_core::material::{JobType, Material};
use lathe_core::process::Reading;
use lathe_db::models::job::Job;
use lathe_db::models::sensor::SensorSample;
use lathe_db::{StoreError, Stores};
use sqlx::PgPool;
use uuid::Uuid;

fn job(machine: &str) -> Job {
    let params = JobParams {
        machine_id: machine.to_string(),
        job_type: JobType::Boring,
        material: Material::Aluminum,
        tool_number: 2,
        estimated_minutes: 3.0,
        operator_id: "op-pg".to_string(),
        description: Some("pg round trip".to_string()),
    };
    Job::new_ongoing(Uuid::new_v4(), &params, Utc::now())
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn health_check_passes(pool: PgPool) {
    lathe_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unique_index_rejects_second_ongoing_job(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let first = job("LATHE-01");
    stores.jobs.insert_job(&first).await.unwrap();

    assert_matches!(
        stores.jobs.insert_job(&job("LATHE-01")).await,
        Err(StoreError::Conflict(_))
    );

    let fetched = stores.jobs.find_job(first.id).await.unwrap().unwrap();
    assert_eq!(fetched.material, Material::Aluminum);
    assert_eq!(fetched.status, JobStatus::Ongoing);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn mark_status_is_guarded_by_ongoing(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let j = job("LATHE-02");
    stores.jobs.insert_job(&j).await.unwrap();

    let end = Utc::now();
    assert!(stores
        .jobs
        .mark_status(j.id, &JobCompletion::failed(end, 0.5, "boom"))
        .await
        .unwrap());
    assert!(!stores
        .jobs
        .mark_status(j.id, &JobCompletion::completed(end, 0.5))
        .await
        .unwrap());

    let stored = stores.jobs.find_job(j.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("boom"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn samples_round_trip_in_time_order(pool: PgPool) {
    let stores = Stores::postgres(pool);
    let j = job("LATHE-03");
    stores.jobs.insert_job(&j).await.unwrap();

    for s in [2, 0, 1] {
        let sample = SensorSample {
            machine_id: j.machine_id.clone(),
            job_id: j.id,
            timestamp: j.start_time + TimeDelta::seconds(s),
            reading: Reading {
                air_temperature: 295.0,
                process_temperature: 413.0,
                rotational_speed: 2000.0,
                torque: 20.0,
                tool_wear: s as f64,
            },
            failure_probability: 0.2,
        };
        stores.sensors.append_sample(&sample).await.unwrap();
    }

    let samples = stores.sensors.samples_for_job(j.id, None, None).await.unwrap();
    let wear: Vec<f64> = samples.iter().map(|s| s.reading.tool_wear).collect();
    assert_eq!(wear, vec![0.0, 1.0, 2.0]);
    assert_eq!(stores.sensors.count_for_job(j.id).await.unwrap(), 3);
}
