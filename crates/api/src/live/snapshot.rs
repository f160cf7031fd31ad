//! Point-in-time views shared by the stream endpoints and the plain
//! dashboard/detail handlers.

use std::collections::HashSet;

use chrono::Utc;
use lathe_core::fleet::Fleet;
use lathe_core::maintenance::MaintenanceSchedule;
use lathe_core::process::Reading;
use lathe_core::types::{JobId, MachineId, Timestamp};
use lathe_db::{StoreError, Stores};
use serde::Serialize;

/// On/off state of one machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineState {
    pub id: MachineId,
    /// Whether the machine has an ongoing job.
    pub is_on: bool,
    pub under_maintenance: bool,
}

/// State of the whole fleet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub lathe_statuses: Vec<MachineState>,
    pub total: usize,
    pub on_count: usize,
    pub off_count: usize,
    pub timestamp: Timestamp,
}

/// Payload of the sensor stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SensorSnapshot {
    Active {
        #[serde(flatten)]
        reading: Reading,
        #[serde(rename = "failureProbability")]
        failure_probability: f64,
        timestamp: Timestamp,
        #[serde(rename = "jobId")]
        job_id: JobId,
    },
    Idle,
}

/// Payload of the simulation-status stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SimulationSnapshot {
    /// A job is ongoing. Readings are absent until its first sample lands.
    Running {
        #[serde(rename = "jobId")]
        job_id: JobId,
        #[serde(flatten)]
        reading: Option<Reading>,
        #[serde(rename = "failureProbability", skip_serializing_if = "Option::is_none")]
        failure_probability: Option<f64>,
    },
    Completed,
}

pub async fn fleet(
    stores: &Stores,
    maintenance: &MaintenanceSchedule,
    fleet: Fleet,
) -> Result<FleetSnapshot, StoreError> {
    let now = Utc::now();
    let running: HashSet<MachineId> = stores
        .jobs
        .list_ongoing_jobs()
        .await?
        .into_iter()
        .map(|job| job.machine_id)
        .collect();
    let in_maintenance = maintenance.active_at(now).await;

    let lathe_statuses: Vec<MachineState> = fleet
        .machine_ids()
        .into_iter()
        .map(|id| MachineState {
            is_on: running.contains(&id),
            under_maintenance: in_maintenance.contains(&id),
            id,
        })
        .collect();
    let on_count = lathe_statuses.iter().filter(|m| m.is_on).count();

    Ok(FleetSnapshot {
        total: lathe_statuses.len(),
        on_count,
        off_count: lathe_statuses.len() - on_count,
        lathe_statuses,
        timestamp: now,
    })
}

/// Latest sample of the machine's ongoing job, or idle.
pub async fn sensor(stores: &Stores, machine_id: &str) -> Result<SensorSnapshot, StoreError> {
    let Some(job) = stores.jobs.find_ongoing_job(machine_id).await? else {
        return Ok(SensorSnapshot::Idle);
    };
    Ok(match stores.sensors.latest_for_job(job.id).await? {
        Some(sample) => SensorSnapshot::Active {
            reading: sample.reading,
            failure_probability: sample.failure_probability,
            timestamp: sample.timestamp,
            job_id: job.id,
        },
        None => SensorSnapshot::Idle,
    })
}

pub async fn simulation(
    stores: &Stores,
    machine_id: &str,
) -> Result<SimulationSnapshot, StoreError> {
    let Some(job) = stores.jobs.find_ongoing_job(machine_id).await? else {
        return Ok(SimulationSnapshot::Completed);
    };
    let latest = stores.sensors.latest_for_job(job.id).await?;
    Ok(SimulationSnapshot::Running {
        job_id: job.id,
        reading: latest.as_ref().map(|s| s.reading),
        failure_probability: latest.map(|s| s.failure_probability),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeDelta;
    use lathe_core::job::JobParams;
    use lathe_core::material::{JobType, Material};
    use lathe_db::models::job::Job;
    use lathe_db::models::sensor::SensorSample;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn params(machine: &str) -> JobParams {
        JobParams {
            machine_id: machine.to_string(),
            job_type: JobType::Drilling,
            material: Material::Aluminum,
            tool_number: 3,
            operator_id: "op-1".to_string(),
            description: None,
            estimated_minutes: 10.0,
        }
    }

    fn reading() -> Reading {
        Reading {
            air_temperature: 300.0,
            process_temperature: 360.0,
            rotational_speed: 2500.0,
            torque: 20.0,
            tool_wear: 1.5,
        }
    }

    #[tokio::test]
    async fn fleet_counts_running_and_maintained_machines() {
        let stores = Stores::memory();
        let schedule = MaintenanceSchedule::new();
        let job = Job::new_ongoing(Uuid::new_v4(), &params("LATHE-02"), Utc::now());
        stores.jobs.insert_job(&job).await.unwrap();
        schedule
            .schedule("LATHE-03", Utc::now() - TimeDelta::minutes(1), TimeDelta::minutes(10))
            .await;

        let snap = fleet(&stores, &schedule, Fleet::new(4)).await.unwrap();

        assert_eq!(snap.total, 4);
        assert_eq!(snap.on_count, 1);
        assert_eq!(snap.off_count, 3);
        assert!(snap.lathe_statuses[1].is_on);
        assert!(snap.lathe_statuses[2].under_maintenance);
        assert!(!snap.lathe_statuses[0].is_on && !snap.lathe_statuses[0].under_maintenance);
    }

    #[tokio::test]
    async fn sensor_snapshot_is_idle_without_samples_and_active_with_one() {
        let stores = Stores::memory();
        assert_eq!(sensor(&stores, "LATHE-01").await.unwrap(), SensorSnapshot::Idle);

        let job = Job::new_ongoing(Uuid::new_v4(), &params("LATHE-01"), Utc::now());
        stores.jobs.insert_job(&job).await.unwrap();
        assert_eq!(sensor(&stores, "LATHE-01").await.unwrap(), SensorSnapshot::Idle);

        stores
            .sensors
            .append_sample(&SensorSample {
                machine_id: "LATHE-01".to_string(),
                job_id: job.id,
                timestamp: job.start_time,
                reading: reading(),
                failure_probability: 0.12,
            })
            .await
            .unwrap();

        let snap = sensor(&stores, "LATHE-01").await.unwrap();
        assert_matches!(snap, SensorSnapshot::Active { job_id, .. } if job_id == job.id);

        let value = serde_json::to_value(snap).unwrap();
        assert_eq!(value["status"], "active");
        assert_eq!(value["airTemperature"], json!(300.0));
        assert_eq!(value["failureProbability"], json!(0.12));
        assert_eq!(value["jobId"], json!(job.id));
    }

    #[tokio::test]
    async fn simulation_snapshot_reports_running_then_completed() {
        let stores = Stores::memory();
        let value = serde_json::to_value(simulation(&stores, "LATHE-05").await.unwrap()).unwrap();
        assert_eq!(value, json!({"status": "completed"}));

        let job = Job::new_ongoing(Uuid::new_v4(), &params("LATHE-05"), Utc::now());
        stores.jobs.insert_job(&job).await.unwrap();
        let value = serde_json::to_value(simulation(&stores, "LATHE-05").await.unwrap()).unwrap();
        assert_eq!(value["status"], "running");
        assert!(value.get("torque").is_none());
    }
}
