//! Custom error types for the account service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{hashing::HashError, policy::PolicyViolation, repositories::RepositoryError};

/// Custom error type for the account service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Password does not meet the strength policy
    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Username already taken at registration
    #[error("Username is already taken")]
    DuplicateUsername,

    /// Login failed; unknown user and wrong password look the same
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but acting on something that is not the caller's
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Storage failure; the detail is logged, never returned
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::PolicyViolation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a repository failure, naming the resource for `NotFound`
    pub fn from_repository(err: RepositoryError, resource: &'static str) -> Self {
        match err {
            RepositoryError::DuplicateUsername => ApiError::DuplicateUsername,
            RepositoryError::NotFound => ApiError::NotFound(resource),
            RepositoryError::Storage(detail) => ApiError::Storage(detail),
        }
    }
}

impl From<HashError> for ApiError {
    fn from(err: HashError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Storage(detail) => {
                error!("Storage failure: {}", detail);
                "Internal server error".to_string()
            }
            ApiError::Internal(detail) => {
                error!("Internal failure: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
