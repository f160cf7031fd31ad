//! Live status broadcasting over server-sent events.
//!
//! Every subscription gets its own polling task that writes the latest
//! snapshot into a `tokio::sync::watch` channel. The HTTP response streams
//! from the receiver, so a slow client only ever sees the most recent
//! snapshot and never holds back the poller or other subscribers. The task
//! ends as soon as the client disconnects (the receiver is dropped).

pub mod snapshot;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lathe_db::StoreError;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;

/// Poll cadence of one subscription.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub interval: Duration,
    /// Pause after a failed snapshot.
    pub backoff: Duration,
}

/// Counts open subscriptions.
#[derive(Debug, Default)]
pub struct StreamGauge {
    active: AtomicUsize,
}

impl StreamGauge {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    fn enter(self: &Arc<Self>) -> GaugeGuard {
        self.active.fetch_add(1, Ordering::Relaxed);
        GaugeGuard(Arc::clone(self))
    }
}

struct GaugeGuard(Arc<StreamGauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Payload pushed when a snapshot could not be taken.
pub fn error_payload(message: impl std::fmt::Display) -> Value {
    json!({ "status": "error", "message": message.to_string() })
}

/// Open a subscription.
///
/// Takes the first snapshot inline so the client receives an event
/// immediately, then spawns the polling task. `snapshot` is called once per
/// tick; errors become an [`error_payload`] followed by `cadence.backoff`
/// instead of `cadence.interval`.
pub async fn subscribe<F, Fut, T>(
    gauge: &Arc<StreamGauge>,
    cadence: Cadence,
    mut snapshot: F,
) -> watch::Receiver<Value>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let (first, mut pause) = render(snapshot().await, cadence);
    let (tx, rx) = watch::channel(first);
    let guard = gauge.enter();

    tokio::spawn(async move {
        let _guard = guard;
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = tokio::time::sleep(pause) => {}
            }
            let (value, next_pause) = render(snapshot().await, cadence);
            pause = next_pause;
            if tx.send(value).is_err() {
                break;
            }
        }
        tracing::debug!("Stream subscriber disconnected");
    });

    rx
}

fn render<T: Serialize>(result: Result<T, StoreError>, cadence: Cadence) -> (Value, Duration) {
    let rendered = result
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::to_value(s).map_err(|e| e.to_string()));
    match rendered {
        Ok(value) => (value, cadence.interval),
        Err(message) => {
            tracing::warn!(error = %message, "Stream snapshot failed, backing off");
            (error_payload(message), cadence.backoff)
        }
    }
}
