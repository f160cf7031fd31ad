use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{TimeDelta, TimeZone, Utc};
use lathe_core::alert::{AlertStatus, ALERT_TYPE_CRITICAL, ALERT_TYPE_GENERAL};
use lathe_core::job::{JobCompletion, JobParams, JobStatus};
use lathe_core::material::{JobType, Material};
use lathe_core::process::Reading;
use lathe_core::types::Timestamp;
use lathe_db::models::alert::NewAlert;
use lathe_db::models::job::Job;
use lathe_db::models::sensor::SensorSample;
use lathe_db::{MemoryStore, StoreError, Stores};
use uuid::Uuid;

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn job(machine: &str, start: Timestamp) -> Job {
    let params = JobParams {
        machine_id: machine.to_string(),
        job_type: JobType::Turning,
        material: Material::MildSteel,
        tool_number: 4,
        estimated_minutes: 5.0,
        operator_id: "op-1".to_string(),
        description: None,
    };
    Job::new_ongoing(Uuid::new_v4(), &params, start)
}

fn sample(job: &Job, at: Timestamp, wear: f64) -> SensorSample {
    SensorSample {
        machine_id: job.machine_id.clone(),
        job_id: job.id,
        timestamp: at,
        reading: Reading {
            air_temperature: 298.0,
            process_temperature: 540.0,
            rotational_speed: 1000.0,
            torque: 30.0,
            tool_wear: wear,
        },
        failure_probability: 0.1,
    }
}

fn alert(machine: &str, severity: i16, requires_maintenance: bool) -> NewAlert {
    NewAlert {
        machine_id: machine.to_string(),
        job_id: None,
        alert_type: if requires_maintenance {
            ALERT_TYPE_CRITICAL.to_string()
        } else {
            ALERT_TYPE_GENERAL.to_string()
        },
        severity,
        message: "Chatter on finishing pass".to_string(),
        requires_maintenance,
        triggered_by: Some("op-1".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_ongoing_job_on_a_machine_conflicts() {
    let stores = Stores::memory();
    let first = job("LATHE-01", t0());
    stores.jobs.insert_job(&first).await.unwrap();

    let second = job("LATHE-01", t0() + TimeDelta::seconds(1));
    assert_matches!(
        stores.jobs.insert_job(&second).await,
        Err(StoreError::Conflict(_))
    );

    // Another machine is unaffected.
    stores.jobs.insert_job(&job("LATHE-02", t0())).await.unwrap();
    assert_eq!(stores.jobs.list_ongoing_jobs().await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_inserts_admit_exactly_one_ongoing_job() {
    let store = Arc::new(MemoryStore::new());
    let stores = Stores::from_memory(store);

    let mut handles = Vec::new();
    for i in 0..16 {
        let jobs = stores.jobs.clone();
        handles.push(tokio::spawn(async move {
            jobs.insert_job(&job("LATHE-05", t0() + TimeDelta::seconds(i)))
                .await
                .is_ok()
        }));
    }

    let mut accepted = 0;
    for h in handles {
        if h.await.unwrap() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn mark_status_transitions_once() {
    let stores = Stores::memory();
    let j = job("LATHE-03", t0());
    stores.jobs.insert_job(&j).await.unwrap();

    let done = JobCompletion::completed(t0() + TimeDelta::minutes(5), 5.0);
    assert!(stores.jobs.mark_status(j.id, &done).await.unwrap());

    let fail = JobCompletion::failed(t0() + TimeDelta::minutes(6), 6.0, "late");
    assert!(!stores.jobs.mark_status(j.id, &fail).await.unwrap());

    let stored = stores.jobs.find_job(j.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.actual_duration, Some(5.0));
    assert!(stored.error_message.is_none());

    // Unknown ids are not an error.
    assert!(!stores.jobs.mark_status(Uuid::new_v4(), &done).await.unwrap());
}

#[tokio::test]
async fn machine_can_start_again_after_its_job_closes() {
    let stores = Stores::memory();
    let j = job("LATHE-04", t0());
    stores.jobs.insert_job(&j).await.unwrap();
    stores
        .jobs
        .mark_status(j.id, &JobCompletion::completed(t0(), 0.0))
        .await
        .unwrap();

    let next = job("LATHE-04", t0() + TimeDelta::minutes(1));
    stores.jobs.insert_job(&next).await.unwrap();

    let history = stores.jobs.list_jobs("LATHE-04").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, next.id, "newest first");
    assert_eq!(
        stores.jobs.find_ongoing_job("LATHE-04").await.unwrap().unwrap().id,
        next.id
    );
}

#[tokio::test]
async fn upsert_is_a_no_op_for_existing_ids() {
    let stores = Stores::memory();
    let mut j = job("LATHE-06", t0());
    stores.jobs.upsert_job(&j).await.unwrap();

    j.operator_id = "someone-else".to_string();
    stores.jobs.upsert_job(&j).await.unwrap();

    let stored = stores.jobs.find_job(j.id).await.unwrap().unwrap();
    assert_eq!(stored.operator_id, "op-1");
}

// ---------------------------------------------------------------------------
// Sensor samples
// ---------------------------------------------------------------------------

#[tokio::test]
async fn samples_are_ordered_and_range_filtered() {
    let stores = Stores::memory();
    let j = job("LATHE-07", t0());
    stores.jobs.insert_job(&j).await.unwrap();

    for s in [10, 0, 5] {
        stores
            .sensors
            .append_sample(&sample(&j, t0() + TimeDelta::seconds(s), s as f64))
            .await
            .unwrap();
    }

    let all = stores.sensors.samples_for_job(j.id, None, None).await.unwrap();
    let times: Vec<_> = all.iter().map(|s| s.timestamp).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);

    let window = stores
        .sensors
        .samples_for_job(
            j.id,
            Some(t0() + TimeDelta::seconds(5)),
            Some(t0() + TimeDelta::seconds(10)),
        )
        .await
        .unwrap();
    assert_eq!(window.len(), 2);

    assert_eq!(stores.sensors.count_for_job(j.id).await.unwrap(), 3);

    let latest = stores.sensors.latest_for_machine("LATHE-07").await.unwrap().unwrap();
    assert_eq!(latest.timestamp, t0() + TimeDelta::seconds(10));
    let latest = stores.sensors.latest_for_job(j.id).await.unwrap().unwrap();
    assert_eq!(latest.reading.tool_wear, 10.0);
}

#[tokio::test]
async fn samples_for_unknown_jobs_are_rejected() {
    let stores = Stores::memory();
    let orphan = job("LATHE-08", t0());
    assert_matches!(
        stores.sensors.append_sample(&sample(&orphan, t0(), 0.0)).await,
        Err(StoreError::NotFound(_))
    );
    assert!(stores.sensors.latest_for_machine("LATHE-08").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_critical_requires_critical_severity() {
    let stores = Stores::memory();
    stores.alerts.insert_alert(&alert("LATHE-09", 3, false)).await.unwrap();
    assert!(stores
        .alerts
        .find_active_critical("LATHE-09")
        .await
        .unwrap()
        .is_none());

    stores.alerts.insert_alert(&alert("LATHE-09", 4, true)).await.unwrap();
    assert!(stores
        .alerts
        .find_active_critical("LATHE-09")
        .await
        .unwrap()
        .is_none());

    let critical = stores.alerts.insert_alert(&alert("LATHE-09", 5, true)).await.unwrap();
    assert_eq!(critical.status, AlertStatus::Active);

    let found = stores
        .alerts
        .find_active_critical("LATHE-09")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, critical.id);

    assert_eq!(stores.alerts.list_alerts("LATHE-09").await.unwrap().len(), 3);
    assert!(stores.alerts.list_alerts("LATHE-10").await.unwrap().is_empty());
}
