//! Application error types and handling.
//!
//! Every failure from a store, the password encoder or the token helper
//! travels up unchanged as an [`AppError`]; the HTTP layer turns it into a
//! structured JSON body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Login password did not match the stored hash.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Token is malformed, badly signed, expired or no longer current.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication required.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Create a conflict error for an email that is already registered.
    pub fn email_taken(email: &str) -> Self {
        Self::Conflict(format!("Email '{}' is already registered", email))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidToken | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_response = ErrorResponse::new(self.error_code(), self.to_string());

        if status.is_server_error() {
            tracing::error!(
                error_code = %self.error_code(),
                status = %status.as_u16(),
                message = %self,
                "API error"
            );
        } else {
            tracing::debug!(
                error_code = %self.error_code(),
                status = %status.as_u16(),
                message = %self,
                "API error"
            );
        }

        HttpResponse::build(status).json(error_response)
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for converting Option to AppResult.
pub trait OptionExt<T> {
    /// Convert None to NotFound error.
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidCredentials.error_code(), "INVALID_CREDENTIALS");
        assert_eq!(AppError::InvalidToken.error_code(), "INVALID_TOKEN");
        assert_eq!(AppError::NotFound("test".into()).error_code(), "NOT_FOUND");
        assert_eq!(AppError::email_taken("a@b.c").error_code(), "CONFLICT");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Validation("test".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<u8> = None;
        assert!(matches!(
            missing.ok_or_not_found("nothing here"),
            Err(AppError::NotFound(msg)) if msg == "nothing here"
        ));
        assert_eq!(Some(3).ok_or_not_found("unused").unwrap(), 3);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("TEST_ERROR"));
        assert!(json.contains("Test message"));
    }
}
