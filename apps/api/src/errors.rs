use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::agent::AgentError;
use crate::cv::CvStoreError;
use crate::profiles::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage read error: {0}")]
    StorageRead(String),

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnsupportedFileType(msg) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FILE_TYPE",
                msg.clone(),
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::StorageRead(msg) => {
                tracing::error!("Storage read error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_READ_ERROR",
                    "Failed to read profile data".to_string(),
                )
            }
            AppError::StorageWrite(msg) => {
                tracing::error!("Storage write error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_WRITE_ERROR",
                    "Failed to save profile data".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Agent API error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Network(msg) => {
                tracing::error!("Agent API unreachable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "NETWORK_ERROR",
                    format!(
                        "Network error - Unable to reach agent API: {msg}. Check if the agent API is accessible"
                    ),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        if e.is_read_failure() {
            AppError::StorageRead(e.to_string())
        } else {
            AppError::StorageWrite(e.to_string())
        }
    }
}

impl From<CvStoreError> for AppError {
    fn from(e: CvStoreError) -> Self {
        match e {
            CvStoreError::UnsupportedType(_) => AppError::UnsupportedFileType(e.to_string()),
            CvStoreError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            CvStoreError::NotFound(_) => AppError::NotFound("CV file not found".to_string()),
            CvStoreError::Io(io) => {
                AppError::Internal(anyhow::Error::new(io).context("CV storage failed"))
            }
        }
    }
}

impl From<AgentError> for AppError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Network(_) => AppError::Network(e.to_string()),
            AgentError::Upstream { .. } => AppError::Upstream(e.to_string()),
            AgentError::Decode(_) => AppError::Internal(
                anyhow::Error::new(e).context("Failed to communicate with agent"),
            ),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::Validation(e.body_text())
        }
    }
}
