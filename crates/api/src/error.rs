use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lathe_core::error::CoreError;
use lathe_db::StoreError;
use lathe_worker::StartError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for storage
/// failures. Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the form `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StartError> for AppError {
    fn from(err: StartError) -> Self {
        match err {
            StartError::Rejected(core) => AppError::Core(core),
            StartError::AlreadyRunning(machine_id) => AppError::Core(CoreError::Conflict(
                format!("Machine {machine_id} is already running a job"),
            )),
            StartError::ShuttingDown => {
                AppError::Unavailable("Simulation registry is shutting down".to_string())
            }
            StartError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::Store(err) => classify_store_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a storage error into an HTTP status, error code and message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        StoreError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{what} not found"),
        ),
        StoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "Storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Storage is temporarily unavailable".to_string(),
            )
        }
        StoreError::Corrupt(_) | StoreError::Database(_) => {
            tracing::error!(error = %err, "Storage error");
            internal()
        }
    }
}
