//! Request authentication gate
//!
//! A protected request is authenticated in a fixed sequence, stopping at the
//! first failure:
//!
//! ```text
//! header present -> `Bearer <token>` shape -> signature -> expiry -> account exists
//! ```
//!
//! Every failure except a storage outage becomes the same `401 Unauthorized`
//! response; the [`Rejection`] variant is only used for logging.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ApiError,
    jwt::{TokenCodec, TokenFailure},
    repositories::{AccountDirectory, RepositoryError},
};

const BEARER_SCHEME: &str = "Bearer";

/// Identity resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub account_id: Uuid,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// Why a request was not authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingHeader,
    MalformedHeader,
    InvalidToken(TokenFailure),
    UnknownAccount(Uuid),
    /// The directory could not be consulted; not the caller's fault
    Storage(String),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Storage(detail) => ApiError::Storage(detail).into_response(),
            _ => ApiError::Unauthorized.into_response(),
        }
    }
}

/// Authenticate-or-reject entry point for protected routes
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    directory: Arc<dyn AccountDirectory>,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self { codec, directory }
    }

    /// Resolve the request's bearer token to a live account
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedIdentity, Rejection> {
        let header = headers.get(AUTHORIZATION).ok_or(Rejection::MissingHeader)?;
        let header = header.to_str().map_err(|_| Rejection::MalformedHeader)?;
        let token = bearer_token(header).ok_or(Rejection::MalformedHeader)?;

        let claims = self.codec.verify(token).map_err(|e| {
            warn!("Rejected bearer token: {:?}", e.reason());
            Rejection::InvalidToken(e.reason())
        })?;

        let account = self
            .directory
            .find_by_id(claims.account_id())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    warn!("Token for missing account {}", claims.account_id());
                    Rejection::UnknownAccount(claims.account_id())
                }
                // Logged once, when the 500 response is rendered
                other => Rejection::Storage(other.to_string()),
            })?;

        Ok(AuthenticatedIdentity {
            account_id: account.id,
            username: account.username,
        })
    }
}

/// Extract the token from `Bearer <token>`; the scheme is case-insensitive
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }

    Some(token)
}
