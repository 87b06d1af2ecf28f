// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::fit::DecodeError;
use crate::services::artifact::ArtifactError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Internal application error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The resource exists but is not in a state that allows the operation.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Precondition(msg) => (
                StatusCode::PRECONDITION_FAILED,
                "precondition_failed",
                Some(msg.clone()),
            ),
            other => {
                tracing::error!(error = %other, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

// ─── Callable Function Errors ────────────────────────────────

/// Error codes surfaced to callers of the query function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallErrorCode {
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    Error,
}

impl CallErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            CallErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            CallErrorCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            CallErrorCode::NotFound => StatusCode::NOT_FOUND,
            CallErrorCode::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Typed error returned by the query function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct CallError {
    pub code: CallErrorCode,
    pub message: String,
}

impl CallError {
    pub fn new(code: CallErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<AppError> for CallError {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::BadRequest(_) => CallErrorCode::InvalidArgument,
            AppError::Unauthorized | AppError::Precondition(_) => {
                CallErrorCode::FailedPrecondition
            }
            AppError::NotFound(_) => CallErrorCode::NotFound,
            _ => CallErrorCode::Error,
        };
        CallError::new(code, err.to_string())
    }
}

#[derive(Serialize)]
struct CallErrorBody<'a> {
    error: &'a CallError,
}

impl IntoResponse for CallError {
    fn into_response(self) -> Response {
        if self.code == CallErrorCode::Error {
            tracing::error!(message = %self.message, "Query function failed");
        } else {
            tracing::info!(code = ?self.code, message = %self.message, "Query function rejected");
        }

        (self.code.status(), Json(CallErrorBody { error: &self })).into_response()
    }
}
