//! Application error taxonomy shared by the services and the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::routes::ErrorResponse;
use crate::store::{BlobError, StoreError};

fn kib(bytes: &usize) -> f64 {
    *bytes as f64 / 1024.0
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input, e.g. a password that is too short.
    #[error("{0}")]
    Validation(String),

    /// A unique key (email, slug) is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Bad credentials, missing admin role, or an unusable reset code.
    #[error("{0}")]
    Auth(String),

    #[error(
        "{kind} too large ({:.1} KiB > {:.0} KiB). Please shorten the content and try again.",
        kib(.actual),
        kib(.limit)
    )]
    PayloadTooLarge {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },

    #[error("Failed to send email: {0}")]
    Notification(String),

    #[error("{0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Notification(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_)
            | AppError::Internal(_)
            | AppError::Store(_)
            | AppError::Blob(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the client.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Auth(_) => "UNAUTHORIZED",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::Notification(_) => "NOTIFICATION_FAILED",
            AppError::Configuration(_) => "MISSING_CONFIGURATION",
            AppError::Internal(_) | AppError::Store(_) | AppError::Blob(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "record store failure");
                "Database error".to_string()
            }
            AppError::Blob(e) => {
                tracing::error!(error = %e, "blob store failure");
                "Storage error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                message: None,
                code: Some(self.code().to_string()),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_names_actual_and_allowed_size() {
        let err = AppError::PayloadTooLarge {
            kind: "Blog content",
            actual: 972_800 + 512,
            limit: 950 * 1024,
        };
        assert_eq!(
            err.to_string(),
            "Blog content too large (950.5 KiB > 950 KiB). Please shorten the content and try again."
        );
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Notification("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Configuration("x".into()).code(),
            "MISSING_CONFIGURATION"
        );
    }
}
