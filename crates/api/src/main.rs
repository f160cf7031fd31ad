use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use lathe_api::background::stall_reconciliation;
use lathe_api::config::{ServerConfig, SimulationConfig, StreamConfig};
use lathe_api::router::build_app_router;
use lathe_api::state::AppState;
use lathe_db::Stores;
use lathe_events::EventJournal;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    lathe_api::logging::init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let simulation = SimulationConfig::from_env();
    let stream_config = StreamConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        fleet_size = simulation.fleet_size,
        sensor_interval_secs = simulation.sensor_interval.as_secs(),
        "Loaded configuration"
    );

    // --- Storage ---
    let (stores, pool) = match &config.database_url {
        Some(database_url) => {
            let pool = lathe_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            lathe_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            lathe_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            (Stores::postgres(pool.clone()), Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            (Stores::memory(), None)
        }
    };

    // --- App state (scorer, event bus, simulation registry) ---
    let reconcile_interval = simulation.reconcile_interval;
    let state = AppState::build(stores, pool, config.clone(), simulation, stream_config);
    let registry = Arc::clone(&state.registry);

    let shutdown = state.shutdown.clone();

    // --- Background tasks ---
    let journal_cancel = CancellationToken::new();
    let journal_handle = tokio::spawn(EventJournal::run(
        state.event_bus.subscribe(),
        journal_cancel.clone(),
    ));

    let reconcile_cancel = CancellationToken::new();
    let reconcile_handle = tokio::spawn(stall_reconciliation::run(
        Arc::clone(&registry),
        reconcile_interval,
        reconcile_cancel.clone(),
    ));

    tracing::info!("Background services started (event journal, stall reconciliation)");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Ends open SSE responses so the server can drain.
            shutdown.cancel();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let budget = Duration::from_secs(config.shutdown_timeout_secs);

    // Stop the reconciler before the workers so it cannot race finalizers.
    reconcile_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reconcile_handle).await;
    tracing::info!("Stall reconciliation stopped");

    if tokio::time::timeout(budget, registry.shutdown()).await.is_err() {
        tracing::warn!("Simulation registry did not shut down within the budget");
    }

    // Journal last so the workers' terminal events are still logged.
    journal_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), journal_handle).await;
    tracing::info!("Event journal stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
