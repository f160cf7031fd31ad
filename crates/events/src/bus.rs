//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the simulation
//! registry, the workers and the HTTP handlers. Publishing never blocks and
//! never fails; events published while nobody listens are dropped.

use chrono::{DateTime, Utc};
use lathe_core::types::{JobId, MachineId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// LatheEvent
// ---------------------------------------------------------------------------

/// A lifecycle event for a machine or job.
///
/// Constructed via [`LatheEvent::new`] and enriched with
/// [`for_machine`](LatheEvent::for_machine), [`for_job`](LatheEvent::for_job),
/// [`with_actor`](LatheEvent::with_actor) and
/// [`with_payload`](LatheEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatheEvent {
    /// Dot-separated event name, e.g. `"job.started"`.
    pub event_type: String,

    pub machine_id: Option<MachineId>,

    pub job_id: Option<JobId>,

    /// Operator that triggered the event, if any.
    pub actor: Option<String>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl LatheEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            machine_id: None,
            job_id: None,
            actor: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_machine(mut self, machine_id: impl Into<MachineId>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    /// Attach both the job and the machine it runs on.
    pub fn for_job(mut self, machine_id: impl Into<MachineId>, job_id: JobId) -> Self {
        self.machine_id = Some(machine_id.into());
        self.job_id = Some(job_id);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use lathe_events::bus::{EventBus, LatheEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(LatheEvent::new("job.started").for_machine("LATHE-01"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<LatheEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers observe `RecvError::Lagged` once the buffer is full.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: LatheEvent) {
        // A send error only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LatheEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use lathe_core::job_events::{EVENT_ALERT_CRITICAL, EVENT_JOB_STARTED};
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn subscriber_receives_job_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let job_id = Uuid::new_v4();

        bus.publish(
            LatheEvent::new(EVENT_JOB_STARTED)
                .for_job("LATHE-04", job_id)
                .with_actor("op-3")
                .with_payload(serde_json::json!({"material": "Wood"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, EVENT_JOB_STARTED);
        assert_eq!(received.machine_id.as_deref(), Some("LATHE-04"));
        assert_eq!(received.job_id, Some(job_id));
        assert_eq!(received.actor.as_deref(), Some("op-3"));
        assert_eq!(received.payload["material"], "Wood");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(LatheEvent::new(EVENT_ALERT_CRITICAL).for_machine("LATHE-02"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.event_type, EVENT_ALERT_CRITICAL);
        assert_eq!(e2.machine_id, e1.machine_id);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(LatheEvent::new("orphan.event"));
    }

    #[test]
    fn bare_event_has_empty_optional_fields() {
        let event = LatheEvent::new("bare.event");
        assert!(event.machine_id.is_none());
        assert!(event.job_id.is_none());
        assert!(event.actor.is_none());
        assert!(event.payload.is_object());
    }
}
