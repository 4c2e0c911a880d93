//! Universal API error envelope
//!
//! Every non-2xx Universal response carries
//! `{"error": {"type", "code", "message", "details?"}}` with a
//! machine-readable code; the HTTP status is chosen by the constructor.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

/// Error taxonomy exposed to Universal API clients.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    AuthenticationError,
    ValidationError,
    RateLimitError,
    ProviderError,
    NotFoundError,
    ServerError,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: ErrorType,
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// A Universal API error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(
        status: StatusCode,
        error_type: ErrorType,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: ErrorDetail {
                    error_type,
                    code: code.into(),
                    message: message.into(),
                    details: None,
                },
            },
        }
    }

    /// Attach structured detail to the envelope.
    pub fn with_details(mut self, details: Value) -> Self {
        self.body.error.details = Some(details);
        self
    }

    /// 400 validation failure.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorType::ValidationError,
            code,
            message,
        )
    }

    /// 401 authentication failure.
    pub fn authentication(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorType::AuthenticationError,
            code,
            message,
        )
    }

    /// 404 for unknown or evicted resources.
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorType::NotFoundError,
            code,
            message,
        )
    }

    /// 502 provider failure.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            ErrorType::ProviderError,
            "send_failed",
            message,
        )
    }

    /// 429 job-store capacity exhaustion, distinct from validation errors.
    pub fn capacity() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            ErrorType::RateLimitError,
            "too_many_jobs",
            "Too many pending jobs, please try again later",
        )
    }

    /// 500 for unexpected internal failures.
    pub fn server() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::ServerError,
            "internal_error",
            "An unexpected error occurred",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
