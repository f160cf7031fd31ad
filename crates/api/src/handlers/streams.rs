//! Server-sent event endpoints.
//!
//! Each endpoint validates its path, opens a [`live::subscribe`]
//! subscription and streams the watch channel as `data:` events carrying
//! one JSON object each.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use lathe_core::types::MachineId;
use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use super::known_machine;
use crate::error::AppResult;
use crate::live::{self, snapshot, Cadence};
use crate::state::AppState;

/// Stream `rx` until the client disconnects or the server shuts down.
fn into_sse(
    rx: watch::Receiver<Value>,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = WatchStream::new(rx)
        .map(|value| Event::default().json_data(value))
        .take_until(shutdown.cancelled_owned());
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// GET /api/v1/fleet/stream
pub async fn fleet(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let cadence = Cadence {
        interval: state.stream_config.fleet_interval,
        backoff: state.stream_config.error_backoff,
    };
    let AppState {
        stores,
        maintenance,
        fleet,
        streams,
        shutdown,
        ..
    } = state;

    let rx = live::subscribe(&streams, cadence, move || {
        let stores = stores.clone();
        let maintenance = maintenance.clone();
        async move { snapshot::fleet(&stores, &maintenance, fleet).await }
    })
    .await;
    into_sse(rx, shutdown)
}

/// GET /api/v1/machines/{machine_id}/stream
///
/// Latest sample of the machine's running job, or `idle`.
pub async fn machine(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let machine_id = known_machine(&state, machine_id)?;
    let cadence = Cadence {
        interval: state.stream_config.machine_interval,
        backoff: state.stream_config.error_backoff,
    };
    let stores = state.stores.clone();

    let rx = live::subscribe(&state.streams, cadence, move || {
        let stores = stores.clone();
        let machine_id = machine_id.clone();
        async move { snapshot::sensor(&stores, &machine_id).await }
    })
    .await;
    Ok(into_sse(rx, state.shutdown.clone()))
}

/// GET /api/v1/machines/{machine_id}/simulation-stream
///
/// `running` with the latest readings while a job is ongoing, then
/// `completed`.
pub async fn simulation(
    State(state): State<AppState>,
    Path(machine_id): Path<MachineId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let machine_id = known_machine(&state, machine_id)?;
    let cadence = Cadence {
        interval: state.stream_config.status_interval,
        backoff: state.stream_config.error_backoff,
    };
    let stores = state.stores.clone();

    let rx = live::subscribe(&state.streams, cadence, move || {
        let stores = stores.clone();
        let machine_id = machine_id.clone();
        async move { snapshot::simulation(&stores, &machine_id).await }
    })
    .await;
    Ok(into_sse(rx, state.shutdown.clone()))
}
