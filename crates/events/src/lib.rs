//! Lifecycle event bus for the lathe fleet service.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LatheEvent`]: the event envelope (job started, job completed, alert
//!   raised, ...).
//! - [`EventJournal`]: background subscriber that writes every event to the
//!   structured log.

pub mod bus;
pub mod journal;

pub use bus::{EventBus, LatheEvent};
pub use journal::EventJournal;
