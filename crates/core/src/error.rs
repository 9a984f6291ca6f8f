//! Structured error handling for the HTTP service.
//!
//! Provides type-safe error handling with automatic conversion to HTTP responses.
//! Internal details are logged but never exposed to clients.

use std::fmt::Display;

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    #[must_use]
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

/// Application error type with automatic response conversion.
///
/// Internal details are logged but sanitized messages are sent to clients.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a not found error for an entity.
    pub fn not_found(entity: &str, id: impl Display) -> Self {
        Self::NotFound(format!("{entity} not found: {id}"))
    }

    /// Create a conflict error for duplicate data.
    #[must_use]
    pub fn conflict(entity: &str, field: &str) -> Self {
        Self::Conflict(format!("{entity} with this {field} already exists"))
    }

    /// Create a validation error for a single field.
    #[must_use]
    pub fn invalid(field: &str, description: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, description)])
    }

    /// Error code string sent in the response body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidArgument(_) | Self::Validation(_) => "invalid_argument",
            Self::Conflict(_) => "conflict",
            Self::AlreadyExists(_) => "already_exists",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Validation(violations) => json!({
                "error": {
                    "code": self.code(),
                    "message": "Validation failed",
                    "violations": violations,
                }
            }),
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                json!({
                    "error": {
                        "code": self.code(),
                        "message": "Internal server error",
                    }
                })
            }
            other => json!({
                "error": {
                    "code": other.code(),
                    "message": other.to_string(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Extension trait for converting errors to `AppError` with logging.
pub trait ResultExt<T> {
    /// Convert error to an internal `AppError` with logging.
    ///
    /// # Errors
    /// Returns `AppError::Internal` with the provided message.
    fn internal(self, msg: &'static str) -> Result<T, AppError>;
}

impl<T, E: Display> ResultExt<T> for Result<T, E> {
    fn internal(self, msg: &'static str) -> Result<T, AppError> {
        self.map_err(|e| {
            error!(error = %e, "{msg}");
            AppError::Internal(msg.to_string())
        })
    }
}

/// Extension trait for Option types.
pub trait OptionExt<T> {
    /// Convert `None` to a not-found error for an entity.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the option is `None`.
    fn ok_or_not_found(self, entity: &str, id: impl Display) -> Result<T, AppError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str, id: impl Display) -> Result<T, AppError> {
        self.ok_or_else(|| AppError::not_found(entity, id))
    }
}
