use axum::{
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// Error body returned by every handler
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error_code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error_code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Validation failed: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn upstream(err: anyhow::Error) -> Self {
        AppError::Upstream(format!("{:#}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Auth(auth) => return auth.into_response(),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiError::new("NOT_FOUND", &format!("{} not found", what)),
            ),
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("VALIDATION_ERROR", &message),
            ),
            AppError::InvalidFields(errors) => {
                let message = errors.to_string();
                let details = serde_json::to_value(errors.field_errors()).unwrap_or_default();
                (
                    StatusCode::BAD_REQUEST,
                    ApiError::new("VALIDATION_ERROR", &message).with_details(details),
                )
            }
            AppError::Conflict(message) => {
                (StatusCode::CONFLICT, ApiError::new("CONFLICT", &message))
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                ApiError::new("FORBIDDEN", "Insufficient permissions"),
            ),
            AppError::Upstream(message) => {
                tracing::error!("Upstream failure: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError::new("UPSTREAM_ERROR", "External service request failed"),
                )
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("DATABASE_ERROR", "Database operation failed"),
                )
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("INTERNAL_ERROR", "Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("Plan").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("full".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Upstream("503".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::InvalidFields(validator::ValidationErrors::new())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::MissingAuthHeader).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
