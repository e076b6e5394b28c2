//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as
//! `{"error": "<message>"}`; server-side failures are logged, captured to
//! Sentry, and reported to the client only as `internal server error`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::services::{AuthError, ServiceError};
use crate::store::StoreError;

/// Message sent for every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Message sent for every rejected token.
pub const INVALID_TOKEN_MESSAGE: &str = "invalid or expired token";

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client sent something unacceptable.
    #[error("{0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Any other server-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Cache(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Rejection for a missing, malformed, expired or revoked token.
    #[must_use]
    pub fn invalid_token() -> Self {
        Self::Unauthorized(INVALID_TOKEN_MESSAGE.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry, never show their details
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => Self::Validation(e.to_string()),
            ServiceError::MissingTag => Self::Validation(err.to_string()),
            ServiceError::NotFound => Self::NotFound(err.to_string()),
            ServiceError::Store(e) => Self::Store(e),
            ServiceError::Cache(e) => Self::Cache(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthorized() {
            return match err {
                AuthError::InvalidCredentials => {
                    Self::Unauthorized("invalid credentials".to_string())
                }
                _ => Self::invalid_token(),
            };
        }
        match err {
            AuthError::InvalidUsername(_) | AuthError::WeakPassword(_) => {
                Self::Validation(err.to_string())
            }
            AuthError::UserAlreadyExists => Self::Validation(err.to_string()),
            AuthError::Store(e) => Self::Store(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mealplan_core::ValidationError;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_is_400_with_message() {
        let err = AppError::from(ServiceError::Validation(ValidationError::MissingCustomer));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "customer is required");
    }

    #[tokio::test]
    async fn test_not_found_is_404() {
        let (status, body) = render(AppError::from(ServiceError::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "meal plan not found");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::from(ServiceError::Cache(CacheError::Backend(
            "redis at 10.0.0.5 refused".to_string(),
        )));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_token_failures_share_one_message() {
        let revoked = AppError::from(AuthError::SessionRevoked);
        let (status, body) = render(revoked).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], INVALID_TOKEN_MESSAGE);
    }

    #[test]
    fn test_auth_status_mapping() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::WeakPassword("short".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::PasswordHash).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
