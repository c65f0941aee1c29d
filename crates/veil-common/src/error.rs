//! Centralized error types for Veil.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that convert directly into API responses without leaking
//! store-layer detail to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Core application error type used across every Veil crate.
#[derive(Debug, thiserror::Error)]
pub enum VeilError {
    // === Auth / session errors ===
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    // === Registration state machine errors ===
    #[error("Registration session not found or expired")]
    RegistrationSessionNotFound,

    #[error("Verification code is incorrect")]
    IncorrectCode,

    #[error("Verification code has expired")]
    CodeExpired,

    #[error("Identity key is already bound for this user")]
    IdentityAlreadyBound,

    // === Crypto verifier errors ===
    #[error("signature verification failed")]
    InvalidSignature,

    // === Pre-key inventory errors ===
    #[error("No one-time pre-keys available for this device")]
    PreKeysExhausted,

    // === Matchmaker errors ===
    #[error("Matchmaking queue is full")]
    QueueFull,

    #[error("No active match for this user")]
    NoActiveMatch,

    // === Resource errors ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Rate limiting (ambient, gates an out-of-scope collaborator) ===
    #[error("Rate limited. Retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl VeilError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::Unauthorized
            | Self::RegistrationSessionNotFound => StatusCode::UNAUTHORIZED,
            Self::IncorrectCode | Self::CodeExpired => StatusCode::BAD_REQUEST,
            Self::IdentityAlreadyBound => StatusCode::CONFLICT,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::PreKeysExhausted => StatusCode::CONFLICT,
            Self::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            Self::NoActiveMatch => StatusCode::NOT_FOUND,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyExists { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RegistrationSessionNotFound => "REGISTRATION_SESSION_NOT_FOUND",
            Self::IncorrectCode => "INCORRECT_CODE",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::IdentityAlreadyBound => "IDENTITY_ALREADY_BOUND",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::PreKeysExhausted => "PREKEYS_EXHAUSTED",
            Self::QueueFull => "QUEUE_FULL",
            Self::NoActiveMatch => "NO_ACTIVE_MATCH",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for VeilError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details to clients
        let message = match &self {
            VeilError::Database(e) => {
                tracing::error!("database error: {e}");
                "An internal error occurred".to_string()
            }
            VeilError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let retry_after_ms = if let VeilError::RateLimited { retry_after_ms } = &self {
            Some(*retry_after_ms)
        } else {
            None
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
            retry_after_ms,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using VeilError.
pub type VeilResult<T> = Result<T, VeilError>;
