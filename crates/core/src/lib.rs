//! Domain building blocks for the lathe fleet service.
//!
//! Everything in this crate is free of storage and HTTP concerns: the
//! material/process model, job lifecycle rules, failure-risk scorers, the
//! fleet definition and the in-memory maintenance schedule.

pub mod alert;
pub mod error;
pub mod fleet;
pub mod job;
pub mod job_events;
pub mod maintenance;
pub mod material;
pub mod process;
pub mod scoring;
pub mod types;
