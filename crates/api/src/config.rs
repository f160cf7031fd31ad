use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use lathe_core::fleet::DEFAULT_FLEET_SIZE;
use lathe_core::maintenance::DEFAULT_WINDOW_MINUTES;

/// Read `key` from the environment, falling back to `default`.
///
/// Panics when the variable is set but does not parse: misconfiguration
/// should fail at startup.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value ('{raw}'): {e}")),
        Err(_) => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Not applied to the
    /// stream endpoints.
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// PostgreSQL URL. When unset the in-memory store is used.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATABASE_URL`         | unset (memory store)       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            database_url: env_opt("DATABASE_URL"),
        }
    }
}

/// Simulation tunables.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub fleet_size: u16,
    /// Time between two samples of a running job.
    pub sensor_interval: Duration,
    /// Logistic model file; the random fallback scorer is used when unset
    /// or unreadable.
    pub scorer_model_path: Option<PathBuf>,
    pub scorer_timeout: Duration,
    /// How often stalled jobs are reconciled in the background.
    pub reconcile_interval: Duration,
    pub maintenance_window_minutes: i64,
}

impl SimulationConfig {
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `FLEET_SIZE`                 | `20`    |
    /// | `SENSOR_INTERVAL_SECS`       | `5`     |
    /// | `SCORER_MODEL_PATH`          | unset   |
    /// | `SCORER_TIMEOUT_MS`          | `250`   |
    /// | `RECONCILE_INTERVAL_SECS`    | `60`    |
    /// | `MAINTENANCE_WINDOW_MINUTES` | `10`    |
    pub fn from_env() -> Self {
        Self {
            fleet_size: env_or("FLEET_SIZE", DEFAULT_FLEET_SIZE),
            sensor_interval: Duration::from_secs(env_or("SENSOR_INTERVAL_SECS", 5)),
            scorer_model_path: env_opt("SCORER_MODEL_PATH").map(PathBuf::from),
            scorer_timeout: Duration::from_millis(env_or("SCORER_TIMEOUT_MS", 250)),
            reconcile_interval: Duration::from_secs(env_or("RECONCILE_INTERVAL_SECS", 60)),
            maintenance_window_minutes: env_or("MAINTENANCE_WINDOW_MINUTES", DEFAULT_WINDOW_MINUTES),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fleet_size: DEFAULT_FLEET_SIZE,
            sensor_interval: Duration::from_secs(5),
            scorer_model_path: None,
            scorer_timeout: Duration::from_millis(250),
            reconcile_interval: Duration::from_secs(60),
            maintenance_window_minutes: DEFAULT_WINDOW_MINUTES,
        }
    }
}

/// Cadence of the live SSE streams.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Sensor flavour of the per-machine stream.
    pub machine_interval: Duration,
    /// Simulation-status flavour of the per-machine stream.
    pub status_interval: Duration,
    pub fleet_interval: Duration,
    /// Pause after a failed snapshot before retrying.
    pub error_backoff: Duration,
}

impl StreamConfig {
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `MACHINE_STREAM_INTERVAL_MS` | `2000`  |
    /// | `STATUS_STREAM_INTERVAL_MS`  | `1000`  |
    /// | `FLEET_STREAM_INTERVAL_MS`   | `3000`  |
    /// | `STREAM_ERROR_BACKOFF_MS`    | `5000`  |
    pub fn from_env() -> Self {
        Self {
            machine_interval: Duration::from_millis(env_or("MACHINE_STREAM_INTERVAL_MS", 2000)),
            status_interval: Duration::from_millis(env_or("STATUS_STREAM_INTERVAL_MS", 1000)),
            fleet_interval: Duration::from_millis(env_or("FLEET_STREAM_INTERVAL_MS", 3000)),
            error_backoff: Duration::from_millis(env_or("STREAM_ERROR_BACKOFF_MS", 5000)),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            machine_interval: Duration::from_secs(2),
            status_interval: Duration::from_secs(1),
            fleet_interval: Duration::from_secs(3),
            error_backoff: Duration::from_secs(5),
        }
    }
}
