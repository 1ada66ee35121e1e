//! Error types for Horizon
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Every variant maps to a stable [`ErrorKind`]; clients match on the
//! kind, never on the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required or caller is not the owner (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Malformed or out-of-range input (400)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Membership already present, e.g. a second like (409)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Uniqueness conflict, e.g. username taken (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Password did not match (401)
    #[error("Invalid credentials")]
    InvalidCredential,

    /// Token is malformed, badly signed or of the wrong type (401)
    #[error("Invalid token")]
    InvalidToken,

    /// Token is past its expiry (401)
    #[error("Token expired")]
    ExpiredToken,

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error (500)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Not implemented (501)
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Stable classification of an [`AppError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Forbidden,
    InvalidArgument,
    AlreadyExists,
    Conflict,
    InvalidCredential,
    InvalidToken,
    ExpiredToken,
    Internal,
    NotImplemented,
}

impl ErrorKind {
    /// HTTP status code for this kind
    pub const fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized
            | ErrorKind::InvalidCredential
            | ErrorKind::InvalidToken
            | ErrorKind::ExpiredToken => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::AlreadyExists | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Wire name, also used as the metric label
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidCredential => "invalid_credential",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::ExpiredToken => "expired_token",
            ErrorKind::Internal => "internal",
            ErrorKind::NotImplemented => "not_implemented",
        }
    }
}

impl AppError {
    /// Stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound => ErrorKind::NotFound,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::InvalidCredential => ErrorKind::InvalidCredential,
            AppError::InvalidToken => ErrorKind::InvalidToken,
            AppError::ExpiredToken => ErrorKind::ExpiredToken,
            AppError::Database(_)
            | AppError::HttpClient(_)
            | AppError::Config(_)
            | AppError::Internal(_) => ErrorKind::Internal,
            AppError::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }

    /// Map a unique-constraint violation to `Conflict`, pass anything else through
    pub fn conflict_on_unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(format!("{what} already taken"));
            }
        }
        AppError::Database(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Internal causes are logged and replaced by a generic message.
    fn into_response(self) -> Response {
        use axum::Json;

        let kind = self.kind();
        let message = match &self {
            AppError::InvalidArgument(msg)
            | AppError::AlreadyExists(msg)
            | AppError::Conflict(msg)
            | AppError::NotImplemented(msg) => msg.clone(),
            AppError::Database(_)
            | AppError::HttpClient(_)
            | AppError::Config(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed with internal error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[kind.as_str()]).inc();

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));

        (kind.status_code(), body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
