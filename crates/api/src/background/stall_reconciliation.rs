//! Periodic cleanup of stalled jobs.
//!
//! Closes `ongoing` jobs whose estimated duration has elapsed without the
//! worker finishing them, e.g. after a process restart left rows behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lathe_worker::SimulationRegistry;
use tokio_util::sync::CancellationToken;

/// Run the reconciliation loop until `cancel` is triggered.
///
/// The first sweep runs immediately so jobs orphaned by a previous process
/// are closed at startup.
pub async fn run(registry: Arc<SimulationRegistry>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Stall reconciliation started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stall reconciliation stopping");
                break;
            }
            _ = interval.tick() => {
                match registry.reconcile_stalled(Utc::now()).await {
                    Ok(0) => tracing::debug!("Stall reconciliation: nothing to close"),
                    Ok(closed) => tracing::info!(closed, "Stall reconciliation: closed stalled jobs"),
                    Err(e) => tracing::error!(error = %e, "Stall reconciliation failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use lathe_core::fleet::Fleet;
    use lathe_core::job::{JobParams, JobStatus};
    use lathe_core::material::{JobType, Material};
    use lathe_db::models::job::Job;
    use lathe_db::Stores;
    use lathe_events::EventBus;
    use lathe_worker::{RiskEstimator, WorkerConfig, WorkerContext};
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn closes_orphaned_jobs_and_stops_on_cancel() {
        let stores = Stores::memory();
        let ctx = WorkerContext {
            stores: stores.clone(),
            estimator: Arc::new(RiskEstimator::fallback()),
            events: Arc::new(EventBus::default()),
            config: WorkerConfig::default(),
        };
        let registry = Arc::new(SimulationRegistry::new(ctx, Fleet::new(5)));

        let params = JobParams {
            machine_id: "LATHE-04".to_string(),
            job_type: JobType::Turning,
            material: Material::MildSteel,
            tool_number: 1,
            estimated_minutes: 5.0,
            operator_id: "op".to_string(),
            description: None,
        };
        let job = Job::new_ongoing(Uuid::new_v4(), &params, Utc::now() - TimeDelta::hours(1));
        stores.jobs.insert_job(&job).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            Arc::clone(&registry),
            Duration::from_secs(60),
            cancel.clone(),
        ));

        let mut closed = None;
        for _ in 0..50 {
            let found = stores.jobs.find_job(job.id).await.unwrap().unwrap();
            if found.status != JobStatus::Ongoing {
                closed = Some(found);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(closed.map(|j| j.status), Some(JobStatus::Completed));

        cancel.cancel();
        handle.await.unwrap();
    }
}
