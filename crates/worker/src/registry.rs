//! Simulation registry: the single owner of every live worker.
//!
//! [`SimulationRegistry`] validates start requests, records the new job,
//! spawns a supervised [`SimulationWorker`] and tracks it by job id until
//! the worker's task removes its own entry. It also closes jobs that have
//! outlived their estimate ([`reconcile_stalled`](SimulationRegistry::reconcile_stalled))
//! and drains all workers on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lathe_core::error::CoreError;
use lathe_core::fleet::Fleet;
use lathe_core::job::{elapsed_minutes, is_stalled, JobCompletion, JobParams};
use lathe_core::job_events::{EVENT_JOB_RECONCILED, EVENT_JOB_STARTED, EVENT_JOB_STOP_REQUESTED};
use lathe_core::process::ProcessModel;
use lathe_core::types::{JobId, MachineId, Timestamp};
use lathe_db::models::job::Job;
use lathe_db::StoreError;
use lathe_events::LatheEvent;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::worker::{supervise, SimulationWorker, WorkerContext};

/// Upper bound on how long shutdown waits for each worker's finalizer.
const SHUTDOWN_WAIT_PER_WORKER: Duration = Duration::from_secs(5);

/// Reasons a start request is refused.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// Unknown machine or invalid parameters.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// The machine already has an ongoing job.
    #[error("Machine {0} is already running a job")]
    AlreadyRunning(MachineId),

    #[error("Simulation registry is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Store(StoreError),
}

/// Bookkeeping for one live worker.
struct TrackedWorker {
    machine_id: MachineId,
    task_handle: tokio::task::JoinHandle<()>,
    /// Child of the registry's master token.
    cancel: CancellationToken,
}

type WorkerIndex = Arc<RwLock<HashMap<JobId, TrackedWorker>>>;

/// Supervises all simulation workers of the process.
///
/// Created once at startup and shared via `Arc` through application state.
pub struct SimulationRegistry {
    workers: WorkerIndex,
    ctx: WorkerContext,
    fleet: Fleet,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

impl SimulationRegistry {
    pub fn new(ctx: WorkerContext, fleet: Fleet) -> Self {
        Self {
            workers: Arc::new(RwLock::new(HashMap::new())),
            ctx,
            fleet,
            cancel: CancellationToken::new(),
        }
    }

    pub fn fleet(&self) -> Fleet {
        self.fleet
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Start a simulated job on `params.machine_id`.
    ///
    /// Validation happens before anything is written. The job row is then
    /// inserted through [`JobStore::insert_job`](lathe_db::JobStore::insert_job),
    /// whose atomic ongoing-job check turns a concurrent second start on the
    /// same machine into [`StartError::AlreadyRunning`].
    pub async fn start(&self, params: JobParams) -> Result<Job, StartError> {
        if self.cancel.is_cancelled() {
            return Err(StartError::ShuttingDown);
        }
        self.fleet.validate_machine_id(&params.machine_id)?;
        params.check()?;

        let mut rng = self.ctx.config.rng();
        let model = ProcessModel::new(
            params.material,
            params.job_type,
            params.tool_number,
            params.estimated_minutes,
            &mut rng,
        )?;

        let job = Job::new_ongoing(Uuid::new_v4(), &params, Utc::now());
        match self.ctx.stores.jobs.insert_job(&job).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(StartError::AlreadyRunning(params.machine_id));
            }
            Err(e) => return Err(StartError::Store(e)),
        }

        let cancel = self.cancel.child_token();
        let worker = SimulationWorker::new(job.clone(), model, rng, self.ctx.clone(), cancel.clone());

        {
            let mut workers = self.workers.write().await;
            let index = Arc::clone(&self.workers);
            let job_id = job.id;
            let task_handle = tokio::spawn(async move {
                supervise(worker).await;
                index.write().await.remove(&job_id);
            });
            workers.insert(
                job.id,
                TrackedWorker {
                    machine_id: job.machine_id.clone(),
                    task_handle,
                    cancel,
                },
            );
        }

        self.ctx.events.publish(
            LatheEvent::new(EVENT_JOB_STARTED)
                .for_job(job.machine_id.clone(), job.id)
                .with_actor(job.operator_id.clone())
                .with_payload(serde_json::json!({
                    "job_type": job.job_type,
                    "material": job.material,
                    "tool_number": job.tool_number,
                    "estimated_minutes": job.estimated_minutes,
                })),
        );
        tracing::info!(job_id = %job.id, machine_id = %job.machine_id, "Job started");

        Ok(job)
    }

    /// Signal the worker of `job_id` to stop. Returns whether a live worker
    /// was found.
    pub async fn stop(&self, job_id: JobId) -> bool {
        let workers = self.workers.read().await;
        let Some(tracked) = workers.get(&job_id) else {
            return false;
        };
        tracked.cancel.cancel();
        self.ctx.events.publish(
            LatheEvent::new(EVENT_JOB_STOP_REQUESTED).for_job(tracked.machine_id.clone(), job_id),
        );
        tracing::info!(job_id = %job_id, machine_id = %tracked.machine_id, "Stop requested");
        true
    }

    /// Close every `ongoing` job whose estimated end lies before `now`.
    ///
    /// Each job is marked `completed` with its wall-clock elapsed duration;
    /// a worker still attached to it is told to stop. Returns how many jobs
    /// this call closed, so a second call with the same `now` returns 0.
    pub async fn reconcile_stalled(&self, now: Timestamp) -> Result<usize, StoreError> {
        let ongoing = self.ctx.stores.jobs.list_ongoing_jobs().await?;
        let mut closed = 0;

        for job in ongoing {
            if !is_stalled(job.start_time, job.estimated_minutes, now) {
                continue;
            }
            let actual = elapsed_minutes(job.start_time, now);
            let completion = JobCompletion::completed(now, actual);
            if !self.ctx.stores.jobs.mark_status(job.id, &completion).await? {
                continue;
            }
            closed += 1;

            if let Some(tracked) = self.workers.read().await.get(&job.id) {
                tracked.cancel.cancel();
            }

            self.ctx.events.publish(
                LatheEvent::new(EVENT_JOB_RECONCILED)
                    .for_job(job.machine_id.clone(), job.id)
                    .with_payload(serde_json::json!({
                        "reason": "stalled",
                        "actual_duration": actual,
                        "estimated_minutes": job.estimated_minutes,
                    })),
            );
            tracing::warn!(
                job_id = %job.id,
                machine_id = %job.machine_id,
                actual_duration = actual,
                "Closed stalled job"
            );
        }

        Ok(closed)
    }

    /// Cancel every worker and wait, bounded per worker, for its finalizer.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down simulation registry");
        self.cancel.cancel();

        // Drain first: finishing tasks take the write lock to deregister.
        let drained: Vec<(JobId, TrackedWorker)> = self.workers.write().await.drain().collect();
        for (job_id, tracked) in drained {
            tracked.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_WAIT_PER_WORKER, tracked.task_handle)
                .await
                .is_err()
            {
                tracing::warn!(job_id = %job_id, "Worker did not finish within the shutdown budget");
            }
        }

        tracing::info!("Simulation registry shut down");
    }

    pub async fn active_count(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_tracked(&self, job_id: JobId) -> bool {
        self.workers.read().await.contains_key(&job_id)
    }
}
