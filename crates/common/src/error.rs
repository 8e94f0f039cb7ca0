//! Common error types and handling for Scrapeq.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Scrapeq application.
///
/// Variant names track the error-kind vocabulary of the external API
/// contract, not internal implementation detail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("Concurrent job limit exceeded")]
    ConcurrentLimitExceeded,

    #[error("No eligible accounts for this job")]
    NoEligibleAccounts,

    #[error("Invalid job state: {0}")]
    InvalidJobState(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Transient error: {0}")]
    Transient(String),
}

impl Error {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::InsufficientCredits { .. } => StatusCode::BAD_REQUEST,
            Error::ConcurrentLimitExceeded => StatusCode::BAD_REQUEST,
            Error::NoEligibleAccounts => StatusCode::BAD_REQUEST,
            Error::InvalidJobState(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Unexpected(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the wire error kind for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "internal",
            Error::Database(_) => "internal",
            Error::Serialization(_) => "internal",
            Error::Authentication(_) => "unauthenticated",
            Error::Authorization(_) => "permission_denied",
            Error::Validation(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Internal(_) => "internal",
            Error::RateLimit(_) => "rate_limited",
            Error::InsufficientCredits { .. } => "insufficient_credits",
            Error::ConcurrentLimitExceeded => "concurrent_limit_exceeded",
            Error::NoEligibleAccounts => "no_eligible_accounts",
            Error::InvalidJobState(_) => "invalid_job_state",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::Transient(_) => "transient",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::Authentication("test".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Authorization("test".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::Validation("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_error_insufficient_credits_status_and_code() {
        let e = Error::InsufficientCredits {
            required: 5,
            available: 2,
        };
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.error_code(), "insufficient_credits");
        assert!(e.to_string().contains("required 5"));
    }

    #[test]
    fn test_error_payload_too_large_status_code() {
        assert_eq!(
            Error::PayloadTooLarge("file".to_string()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_error_no_eligible_accounts_code() {
        assert_eq!(Error::NoEligibleAccounts.error_code(), "no_eligible_accounts");
    }

    #[test]
    fn test_error_invalid_job_state_code() {
        assert_eq!(
            Error::InvalidJobState("terminal".to_string()).error_code(),
            "invalid_job_state"
        );
    }

    #[test]
    fn test_error_rate_limit_status_code() {
        assert_eq!(
            Error::RateLimit("test".to_string()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
