//! Tracing subscriber setup for the binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
///
/// `lathe_events` is the target of the lifecycle event journal.
pub const DEFAULT_LOG_FILTER: &str =
    "lathe_api=debug,lathe_worker=debug,lathe_db=info,lathe_events=info,tower_http=debug";

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_LOG_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON lines.
pub fn init() {
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(env_filter())
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
