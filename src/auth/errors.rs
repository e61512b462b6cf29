use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Password validation failed: {0}")]
    PasswordValidation(String),
    #[error("Email validation failed: {0}")]
    EmailValidation(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing error: {0}")]
    PasswordHashing(#[from] crate::auth::password::PasswordError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "EMAIL_EXISTS"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthError::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "MISSING_AUTH_HEADER"),
            AuthError::InvalidAuthHeaderFormat => (StatusCode::UNAUTHORIZED, "INVALID_AUTH_HEADER"),
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::PasswordValidation(_) => (StatusCode::BAD_REQUEST, "PASSWORD_VALIDATION"),
            AuthError::EmailValidation(_) => (StatusCode::BAD_REQUEST, "EMAIL_VALIDATION"),
            AuthError::Database(err) => {
                tracing::error!("Auth database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            AuthError::Jwt(_) => (StatusCode::UNAUTHORIZED, "TOKEN_ERROR"),
            AuthError::PasswordHashing(err) => match err {
                crate::auth::password::PasswordError::HashingFailed
                | crate::auth::password::PasswordError::VerificationFailed => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PASSWORD_PROCESSING")
                }
                _ => (StatusCode::BAD_REQUEST, "PASSWORD_VALIDATION"),
            },
        };

        // Don't leak database details to clients
        let message = match &self {
            AuthError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error_code": error_code,
            "message": message,
            "details": null,
        }));

        (status, body).into_response()
    }
}
