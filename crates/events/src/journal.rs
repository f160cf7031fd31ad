//! Event journal: writes every lifecycle event to the structured log.
//!
//! [`EventJournal`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! runs as a long-lived background task until the bus is dropped or the
//! cancellation token fires.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::LatheEvent;

pub struct EventJournal;

impl EventJournal {
    /// Run the journal loop. Returns how many events were logged.
    ///
    /// On cancel, events already buffered in the receiver are still logged
    /// before returning.
    pub async fn run(
        mut receiver: broadcast::Receiver<LatheEvent>,
        cancel: CancellationToken,
    ) -> usize {
        let mut recorded = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    while let Ok(event) = receiver.try_recv() {
                        Self::record(&event);
                        recorded += 1;
                    }
                    tracing::info!(recorded, "Event journal stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        Self::record(&event);
                        recorded += 1;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event journal lagged, some events were not logged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, journal shutting down");
                        break;
                    }
                }
            }
        }
        recorded
    }

    fn record(event: &LatheEvent) {
        tracing::info!(
            target: "lathe_events",
            event_type = %event.event_type,
            machine_id = event.machine_id.as_deref().unwrap_or("-"),
            job_id = ?event.job_id,
            actor = event.actor.as_deref().unwrap_or("-"),
            payload = %event.payload,
            "Lifecycle event"
        );
    }
}
