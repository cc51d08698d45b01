//! Quiz server error types with HTTP status code mapping.
//!
//! [`QuizError`] is the central error type for the server. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! The same type flows back over WebSocket as an `error` message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "quiz not found: 3f1c...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`QuizError`] for ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                   |
/// |-----------|-----------------|-------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request               |
/// | 2000–2099 | Not Found       | 404 Not Found                 |
/// | 2100–2199 | Authorization   | 401 Unauthorized / 403 Forbidden |
/// | 2200–2299 | State           | 409 Conflict                  |
/// | 3000–3999 | Server          | 500 / 503                     |
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// Quiz with the given ID was not found.
    #[error("quiz not found: {0}")]
    QuizNotFound(uuid::Uuid),

    /// Question with the given ID was not found in the quiz.
    #[error("question not found: {0}")]
    QuestionNotFound(uuid::Uuid),

    /// No participant with the given nickname has joined the quiz.
    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Host token missing from a host-only request.
    #[error("authentication required: {0}")]
    Unauthorized(String),

    /// Host token present but does not match the quiz.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Operation not allowed in the quiz's current status.
    #[error("{0}")]
    Conflict(String),

    /// Database failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Channel layer failure (Redis publish, serialization of envelopes).
    #[error("channel layer error: {0}")]
    ChannelLayer(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuizError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::QuizNotFound(_) => 2001,
            Self::QuestionNotFound(_) => 2002,
            Self::ParticipantNotFound(_) => 2003,
            Self::Unauthorized(_) => 2101,
            Self::Forbidden(_) => 2103,
            Self::Conflict(_) => 2201,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::ChannelLayer(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::QuizNotFound(_) | Self::QuestionNotFound(_) | Self::ParticipantNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ChannelLayer(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<redis::RedisError> for QuizError {
    fn from(err: redis::RedisError) -> Self {
        Self::ChannelLayer(err.to_string())
    }
}

impl From<JsonRejection> for QuizError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
