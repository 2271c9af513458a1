//! API error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use royset_core::{EngineError, ErrorKind};
use royset_sdk::api::ErrorBody;

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The engine rejected the operation.
    Engine(EngineError),
    /// A mirror database query failed.
    Database(sqlx::Error),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Database(e)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientState => StatusCode::CONFLICT,
        ErrorKind::TransferFailed => StatusCode::BAD_GATEWAY,
        ErrorKind::Reentrant => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Engine(e) => {
                let kind = e.kind();
                let body = ErrorBody {
                    kind: kind.as_str().to_string(),
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                };
                (status_for(kind), Json(body)).into_response()
            }
            ApiError::Database(e) => {
                tracing::error!(error = %e, "API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
