//! Job simulation runtime.
//!
//! - [`RiskEstimator`]: bounded-time failure-probability evaluation with a
//!   random fallback.
//! - [`SimulationWorker`]: one task per running job, producing and
//!   persisting sensor samples until the job's duration elapses or it is
//!   stopped.
//! - [`SimulationRegistry`]: owns every live worker, enforces one running
//!   job per machine and reconciles stalled jobs.

pub mod estimator;
pub mod registry;
pub mod worker;

pub use estimator::RiskEstimator;
pub use registry::{SimulationRegistry, StartError};
pub use worker::{SimulationWorker, WorkerConfig, WorkerContext, WorkerOutcome};
