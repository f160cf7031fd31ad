//! Per-job simulation worker.
//!
//! A [`SimulationWorker`] owns one `ongoing` job. Each tick it computes a
//! reading from the job's [`ProcessModel`], scores it, and appends a
//! [`SensorSample`]. The loop ends when the job's estimated duration has
//! elapsed, when its cancellation token fires, or when storage has failed
//! too many times in a row.
//!
//! [`supervise`] runs the worker in its own task and then applies the
//! terminal state exactly once, whatever way the worker ended (including a
//! panic, which surfaces as a `JoinError`).

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use lathe_core::job::JobCompletion;
use lathe_core::job_events::{EVENT_JOB_COMPLETED, EVENT_JOB_FAILED};
use lathe_core::process::{round_to, ProcessModel};
use lathe_core::types::Timestamp;
use lathe_db::models::job::Job;
use lathe_db::models::sensor::SensorSample;
use lathe_db::Stores;
use lathe_events::{EventBus, LatheEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::estimator::RiskEstimator;

/// Default time between two samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of consecutive failed sample writes tolerated.
pub const DEFAULT_MAX_CONSECUTIVE_STORAGE_ERRORS: u32 = 12;

/// Tunables shared by every worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub sample_interval: Duration,
    pub max_consecutive_storage_errors: u32,
    /// Fixed RNG seed; `None` seeds each worker from the OS.
    pub seed: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            max_consecutive_storage_errors: DEFAULT_MAX_CONSECUTIVE_STORAGE_ERRORS,
            seed: None,
        }
    }
}

impl WorkerConfig {
    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Collaborators handed to every worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub stores: Stores,
    pub estimator: Arc<RiskEstimator>,
    pub events: Arc<EventBus>,
    pub config: WorkerConfig,
}

/// How a worker's loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    /// The estimated duration elapsed.
    Finished { elapsed: Duration },
    /// The stop signal was observed.
    Stopped { elapsed: Duration },
    /// An unrecoverable error ended the run.
    Failed { elapsed: Duration, error: String },
}

impl WorkerOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            WorkerOutcome::Finished { elapsed }
            | WorkerOutcome::Stopped { elapsed }
            | WorkerOutcome::Failed { elapsed, .. } => *elapsed,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            WorkerOutcome::Finished { .. } => "finished",
            WorkerOutcome::Stopped { .. } => "stopped",
            WorkerOutcome::Failed { .. } => "failed",
        }
    }

    /// Terminal state for a job that started at `start_time`.
    ///
    /// Stopped runs close as `completed` with the time actually spent.
    pub fn completion(&self, start_time: Timestamp) -> JobCompletion {
        let elapsed = self.elapsed();
        let end_time = start_time + to_time_delta(elapsed);
        let minutes = round_to(elapsed.as_secs_f64() / 60.0, 2);
        match self {
            WorkerOutcome::Failed { error, .. } => {
                JobCompletion::failed(end_time, minutes, error.clone())
            }
            _ => JobCompletion::completed(end_time, minutes),
        }
    }
}

fn to_time_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::zero())
}

/// Telemetry generator for one job.
pub struct SimulationWorker {
    job: Job,
    model: ProcessModel,
    rng: StdRng,
    ctx: WorkerContext,
    cancel: CancellationToken,
}

impl SimulationWorker {
    pub fn new(
        job: Job,
        model: ProcessModel,
        rng: StdRng,
        ctx: WorkerContext,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            model,
            rng,
            ctx,
            cancel,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Run the sampling loop to its end. Does not write the terminal state;
    /// see [`supervise`].
    pub async fn run(mut self) -> WorkerOutcome {
        let started = Instant::now();
        let duration = Duration::from_secs_f64(self.job.estimated_minutes * 60.0);
        let job_id = self.job.id;
        let machine_id = self.job.machine_id.clone();

        if let Err(e) = self.ctx.stores.jobs.upsert_job(&self.job).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to record job");
            return WorkerOutcome::Failed {
                elapsed: started.elapsed(),
                error: format!("failed to record job: {e}"),
            };
        }

        tracing::info!(
            job_id = %job_id,
            machine_id = %machine_id,
            material = %self.job.material,
            job_type = %self.job.job_type,
            base_rpm = self.model.base_rpm(),
            base_torque = self.model.base_torque(),
            "Simulation started"
        );

        let mut last_timestamp: Option<Timestamp> = None;
        let mut consecutive_errors: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return WorkerOutcome::Stopped {
                    elapsed: started.elapsed(),
                };
            }
            let elapsed = started.elapsed();
            if elapsed >= duration {
                return WorkerOutcome::Finished { elapsed };
            }

            let reading = self.model.reading(elapsed.as_secs_f64() / 60.0, &mut self.rng);
            let failure_probability = self.ctx.estimator.estimate(&reading).await;

            let mut timestamp = self.job.start_time + to_time_delta(elapsed);
            if let Some(last) = last_timestamp {
                if timestamp <= last {
                    timestamp = last + TimeDelta::microseconds(1);
                }
            }

            let sample = SensorSample {
                machine_id: machine_id.clone(),
                job_id,
                timestamp,
                reading,
                failure_probability,
            };

            match self.ctx.stores.sensors.append_sample(&sample).await {
                Ok(()) => {
                    consecutive_errors = 0;
                    last_timestamp = Some(timestamp);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        job_id = %job_id,
                        error = %e,
                        consecutive_errors,
                        "Failed to persist sensor sample, skipping"
                    );
                    if consecutive_errors >= self.ctx.config.max_consecutive_storage_errors {
                        return WorkerOutcome::Failed {
                            elapsed: started.elapsed(),
                            error: format!(
                                "storage unavailable after {consecutive_errors} consecutive failures: {e}"
                            ),
                        };
                    }
                }
            }

            let remaining = duration.saturating_sub(started.elapsed());
            let pause = remaining.min(self.ctx.config.sample_interval);
            if pause.is_zero() {
                continue;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return WorkerOutcome::Stopped { elapsed: started.elapsed() };
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

/// Run `worker` in its own task, then write the terminal state.
///
/// The finalizer runs exactly once for every exit path and never
/// propagates its own failures.
pub async fn supervise(worker: SimulationWorker) -> WorkerOutcome {
    let started = Instant::now();
    let job = worker.job.clone();
    let ctx = worker.ctx.clone();

    let outcome = match tokio::spawn(worker.run()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "Simulation task aborted");
            WorkerOutcome::Failed {
                elapsed: started.elapsed(),
                error: format!("simulation task aborted: {e}"),
            }
        }
    };

    finalize(&ctx, &job, &outcome).await;
    outcome
}

/// Apply the terminal state for `outcome` if the job is still ongoing.
async fn finalize(ctx: &WorkerContext, job: &Job, outcome: &WorkerOutcome) {
    let completion = outcome.completion(job.start_time);

    match ctx.stores.jobs.mark_status(job.id, &completion).await {
        Ok(true) => {
            let event_type = match outcome {
                WorkerOutcome::Failed { .. } => EVENT_JOB_FAILED,
                _ => EVENT_JOB_COMPLETED,
            };
            ctx.events.publish(
                LatheEvent::new(event_type)
                    .for_job(job.machine_id.clone(), job.id)
                    .with_payload(serde_json::json!({
                        "reason": outcome.reason(),
                        "actual_duration": completion.actual_duration,
                        "error": completion.error,
                    })),
            );
            tracing::info!(
                job_id = %job.id,
                machine_id = %job.machine_id,
                status = %completion.status,
                actual_duration = completion.actual_duration,
                "Simulation finished"
            );
        }
        Ok(false) => {
            tracing::debug!(job_id = %job.id, "Job already closed, terminal state left unchanged");
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "Failed to mark job completion");
        }
    }
}
