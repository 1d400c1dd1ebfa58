//! Typed API error for HTTP handlers.
//!
//! Converts service errors into JSON responses of the form
//! `{"success": false, "error": "message"}` with a matching status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use treewright_service::ServiceError;
use treewright_storage::StorageError;

/// API error with HTTP status code and human-readable message.
///
/// `Internal` logs the real error server-side and returns a static message
/// to the client.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict: a sync is already running or synced data is missing.
    Conflict(String),
    /// 500 Internal Server Error. Details logged, not exposed.
    Internal(anyhow::Error),
    /// 502 Bad Gateway: the directory, validator, or LLM provider failed.
    BadGateway(String),
    /// 503 Service Unavailable: required backend not configured.
    ServiceUnavailable(String),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadGateway(msg)
            | Self::ServiceUnavailable(msg) => msg,
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                "internal server error".to_owned()
            },
        };
        let body = serde_json::json!({"success": false, "error": message});
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ref e if e.is_duplicate() => Self::Conflict(err.to_string()),
            ServiceError::Storage(StorageError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            ServiceError::InvalidInput(msg) => Self::BadRequest(msg),
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::NotConfigured(msg) => Self::ServiceUnavailable(msg),
            ServiceError::NotReady(msg) => Self::Conflict(msg),
            ServiceError::Remote(e) => {
                tracing::warn!(error = %e, "upstream request failed");
                Self::BadGateway(e.to_string())
            },
            ServiceError::Llm(e) => {
                tracing::warn!(error = %e, "llm request failed");
                Self::BadGateway(e.to_string())
            },
            _ => Self::Internal(err.into()),
        }
    }
}
