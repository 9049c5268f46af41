use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Bodies are a flat `{"error": message}` object, with a `details` field added
/// for upstream LLM failures. Clients match on the message strings, so they
/// are part of the API contract.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Upstream LLM failure. `message` is the endpoint's stable summary;
    /// `details` passes through what the provider said, best effort.
    #[error("{message}: {details}")]
    Llm { message: String, details: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps a provider failure under the endpoint's stable summary message.
    pub fn llm(message: &str, err: LlmError) -> Self {
        Self::Llm {
            message: message.to_string(),
            details: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            AppError::Store(err) => {
                let (status, message) = match &err {
                    StoreError::Unavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "Record store unavailable")
                    }
                    StoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "Permission denied"),
                    StoreError::Unauthenticated => {
                        (StatusCode::UNAUTHORIZED, "Authentication required")
                    }
                    StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Record not found"),
                    StoreError::Backend(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "A storage error occurred")
                    }
                };
                if status.is_server_error() {
                    tracing::error!("store error: {err}");
                } else {
                    tracing::warn!("store error: {err}");
                }
                (status, Json(json!({ "error": message }))).into_response()
            }
            AppError::Llm { message, details } => {
                tracing::error!("LLM error: {message}: {details}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message, "details": details })),
                )
                    .into_response()
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An internal server error occurred" })),
                )
                    .into_response()
            }
        }
    }
}
