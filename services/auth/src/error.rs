//! HTTP error type for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::ApiKeyError;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by auth and admin handlers
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("A user with this email already exists")]
    DuplicateOwner,

    #[error("Internal server error")]
    InternalServerError,
}

impl From<ApiKeyError> for AuthError {
    fn from(err: ApiKeyError) -> Self {
        match err {
            ApiKeyError::NotFound => AuthError::NotFound("API key".to_string()),
            ApiKeyError::Invalid => AuthError::Unauthorized,
            ApiKeyError::Disabled | ApiKeyError::Expired => AuthError::Forbidden,
            ApiKeyError::Storage(e) => {
                error!("API key storage failure: {}", e);
                AuthError::InternalServerError
            }
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        error!("Unhandled error: {:#}", err);
        AuthError::InternalServerError
    }
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::DuplicateOwner => StatusCode::CONFLICT,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
