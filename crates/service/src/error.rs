//! Typed error enums for the service layer.
//!
//! Unifies storage, LLM, and remote API failures into a single error type,
//! so HTTP handlers can map each failure mode to a status code.

use thiserror::Error;
use treewright_llm::LlmError;
use treewright_storage::StorageError;

/// Failure talking to the user directory or the tree validator.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx answer. `message` is the body's `message` field when present.
    #[error("{service} request failed ({code}): {message}")]
    HttpStatus { service: &'static str, code: u16, message: String },

    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse { service: &'static str, message: String },

    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

/// Service-layer error unifying storage, LLM, and remote failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage operation failed (DB, not found, duplicate, etc.).
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// LLM API call failed.
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    /// Directory or validator call failed.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// Caller provided invalid input (missing ids, malformed payloads).
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    /// Required backend (LLM, directory API, validator) is not configured.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// A precondition on synced data is not met yet.
    #[error("{0}")]
    NotReady(String),
}

impl ServiceError {
    /// Whether this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Storage(StorageError::NotFound { .. }))
    }

    /// Whether this error represents a duplicate/conflict.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_duplicate())
    }
}
