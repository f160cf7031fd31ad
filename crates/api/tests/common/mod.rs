#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lathe_api::config::{ServerConfig, SimulationConfig, StreamConfig};
use lathe_api::router::build_app_router;
use lathe_api::state::AppState;
use lathe_db::Stores;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
    }
}

/// Small fleet, fast sampling.
pub fn test_simulation_config() -> SimulationConfig {
    SimulationConfig {
        fleet_size: 5,
        sensor_interval: Duration::from_millis(50),
        ..SimulationConfig::default()
    }
}

pub fn test_stream_config() -> StreamConfig {
    StreamConfig {
        machine_interval: Duration::from_millis(50),
        status_interval: Duration::from_millis(50),
        fleet_interval: Duration::from_millis(50),
        error_backoff: Duration::from_millis(100),
    }
}

/// Build the full application router over in-memory storage.
///
/// Returns the state as well so tests can inspect the registry and stores
/// directly.
pub fn build_test_app() -> (Router, AppState) {
    let config = test_config();
    let state = AppState::build(
        Stores::memory(),
        None,
        config.clone(),
        test_simulation_config(),
        test_stream_config(),
    );
    (build_app_router(state.clone(), &config), state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A valid start-job body.
pub fn job_body(minutes: f64) -> serde_json::Value {
    serde_json::json!({
        "job_type": "drilling",
        "material": "Aluminum",
        "tool_number": 3,
        "estimated_minutes": minutes,
        "operator_id": "op-7",
    })
}
