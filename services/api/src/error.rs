//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::ApiKeyError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::timer::TimerError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or unusable credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Valid credentials without the required rights
    #[error("{0}")]
    Forbidden(String),

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Missing resource, or one owned by someone else
    #[error("{0} not found")]
    NotFound(String),

    /// Dependency unavailable
    #[error("{0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error")]
    Database(#[from] common::error::DatabaseError),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ApiKeyError> for ApiError {
    fn from(err: ApiKeyError) -> Self {
        match err {
            ApiKeyError::Invalid | ApiKeyError::NotFound => ApiError::Unauthorized(err.to_string()),
            ApiKeyError::Disabled | ApiKeyError::Expired => ApiError::Forbidden(err.to_string()),
            ApiKeyError::Storage(e) => {
                error!("API key storage failure: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl From<TimerError> for ApiError {
    fn from(err: TimerError) -> Self {
        match err {
            TimerError::InvalidDuration { .. } => ApiError::BadRequest(err.to_string()),
            TimerError::NotFoundOrForbidden => ApiError::NotFound("Parking".to_string()),
            TimerError::NoActiveTimer => ApiError::NotFound("Timer".to_string()),
            TimerError::Unavailable => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Unhandled error: {:#}", err);
        ApiError::InternalServerError
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(e) = &self {
            error!("Database failure: {}", e);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
