//! HTTP error mapping
//!
//! Every pipeline failure converts to one `ApiError` at the handler
//! boundary: a stable status code, a machine-readable code, and a message
//! safe to expose. Server-side detail goes to the log, never to the client.

use crate::error::RemovalError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// One client-facing error: status, stable code, safe message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status for the response
    pub status: StatusCode,
    /// Machine-readable error code, stable across releases
    pub code: &'static str,
    /// Human-readable message, safe to expose to clients
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Request body exceeded the configured limit
    #[must_use]
    pub fn payload_too_large(max_bytes: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            format!("File too large. Maximum size is {} bytes", max_bytes),
        )
    }

    /// No image field in the request
    #[must_use]
    pub fn missing_image() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "missing_image",
            "No image file provided",
        )
    }

    /// Image field present but empty
    #[must_use]
    pub fn empty_image(detail: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "empty_image", detail)
    }

    /// File extension outside the allow-list
    #[must_use]
    pub fn unsupported_type(filename: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "unsupported_type",
            format!("Unsupported file type: '{filename}'"),
        )
    }

    /// Upload bytes could not be decoded as an image
    #[must_use]
    pub fn invalid_image() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_image",
            "Invalid or corrupt image file",
        )
    }

    /// Inference failed or timed out
    #[must_use]
    pub fn inference_failed() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "inference_failed",
            "Background removal failed",
        )
    }

    /// Catch-all for unexpected failures
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }
}

impl From<RemovalError> for ApiError {
    /// The static failure-kind → status table from the pipeline contract
    fn from(err: RemovalError) -> Self {
        match err {
            RemovalError::Decode(detail) => {
                tracing::warn!(error = %detail, "Rejected undecodable upload");
                Self::invalid_image()
            },
            RemovalError::UnsupportedFormat(filename) => Self::unsupported_type(&filename),
            RemovalError::Inference(detail) => {
                tracing::error!(error = %detail, "Inference failed");
                Self::inference_failed()
            },
            RemovalError::Timeout(secs) => {
                tracing::error!(timeout_secs = secs, "Inference timed out");
                Self::inference_failed()
            },
            other => {
                tracing::error!(error = %other, "Unhandled pipeline failure");
                Self::internal()
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}
