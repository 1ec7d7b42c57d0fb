use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::preview::PreviewError;
use crate::storage::StorageError;

/// Every failure a store mutation or an API handler can report.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required request parameter was absent or empty.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// A field failed validation (empty title, unknown category, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No entity of the given kind has this id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An asynchronous result arrived after its target was changed or removed.
    #[error("Stale update rejected: {0}")]
    Stale(String),

    #[error("Link preview failed: {0}")]
    Preview(#[from] PreviewError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Stale(_) => StatusCode::CONFLICT,
            AppError::Preview(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to clients. Upstream and storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Preview(_) => "Failed to fetch link preview".to_string(),
            AppError::Storage(_) => "Failed to access local storage".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
