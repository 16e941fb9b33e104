pub mod categories;
pub mod products;
pub mod state;
pub mod stores;

use axum::{http::StatusCode, Json};
use log::error;
use serde::Serialize;

use crate::error::StorefrontError;

/// Error response structure with user-friendly message
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status_code: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status_code,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Maps StorefrontError to a status code and a message safe to show callers.
/// Storage failures are logged and reported generically.
pub(crate) fn error_response(e: StorefrontError) -> ApiError {
    match e {
        StorefrontError::NotFound(msg) => api_error(StatusCode::NOT_FOUND, msg),
        StorefrontError::Conflict(msg) => api_error(StatusCode::CONFLICT, msg),
        StorefrontError::InvalidInput(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        StorefrontError::PoolError(pool_err) => {
            error!("Connection pool error: {}", pool_err);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database connection error")
        }
        StorefrontError::DatabaseError(db_err) => {
            error!("Database error: {}", db_err);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
        }
        other => {
            error!("Unexpected error: {}", other);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred",
            )
        }
    }
}

/// Runs database work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StorefrontError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| {
            error!("Blocking task failed: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred",
            )
        })?
        .map_err(error_response)
}
