use std::sync::Arc;

use lathe_core::fleet::Fleet;
use lathe_core::maintenance::MaintenanceSchedule;
use lathe_core::scoring::select_scorer;
use lathe_db::{DbPool, Stores};
use lathe_events::EventBus;
use lathe_worker::{RiskEstimator, SimulationRegistry, WorkerConfig, WorkerContext};
use tokio_util::sync::CancellationToken;

use crate::config::{ServerConfig, SimulationConfig, StreamConfig};
use crate::live::StreamGauge;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc` or is `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Job, sensor and alert storage.
    pub stores: Stores,
    /// Present when running against PostgreSQL; used by the health check.
    pub pool: Option<DbPool>,
    pub registry: Arc<SimulationRegistry>,
    pub maintenance: Arc<MaintenanceSchedule>,
    pub event_bus: Arc<EventBus>,
    pub fleet: Fleet,
    /// Number of open SSE subscriptions.
    pub streams: Arc<StreamGauge>,
    pub config: Arc<ServerConfig>,
    pub simulation: Arc<SimulationConfig>,
    pub stream_config: Arc<StreamConfig>,
    /// Cancelled when the server begins graceful shutdown; ends open streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire up the simulation runtime around `stores`.
    ///
    /// Selects the scorer once (logging why a configured model could not be
    /// used) and creates the event bus and registry.
    pub fn build(
        stores: Stores,
        pool: Option<DbPool>,
        config: ServerConfig,
        simulation: SimulationConfig,
        stream_config: StreamConfig,
    ) -> Self {
        let (scorer, load_error) = select_scorer(simulation.scorer_model_path.as_deref());
        if let Some(e) = load_error {
            tracing::warn!(
                error = %e,
                path = ?simulation.scorer_model_path,
                "Failed to load scorer model, using random fallback"
            );
        }
        tracing::info!(scorer = scorer.name(), "Failure-risk scorer selected");

        let event_bus = Arc::new(EventBus::default());
        let fleet = Fleet::new(simulation.fleet_size);
        let ctx = WorkerContext {
            stores: stores.clone(),
            estimator: Arc::new(RiskEstimator::new(scorer, simulation.scorer_timeout)),
            events: Arc::clone(&event_bus),
            config: WorkerConfig {
                sample_interval: simulation.sensor_interval,
                ..WorkerConfig::default()
            },
        };

        Self {
            stores,
            pool,
            registry: Arc::new(SimulationRegistry::new(ctx, fleet)),
            maintenance: Arc::new(MaintenanceSchedule::new()),
            event_bus,
            fleet,
            streams: Arc::new(StreamGauge::default()),
            config: Arc::new(config),
            simulation: Arc::new(simulation),
            stream_config: Arc::new(stream_config),
            shutdown: CancellationToken::new(),
        }
    }
}
