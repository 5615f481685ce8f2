//! JWT codec for bearer token issuance and verification
//!
//! Tokens are HS256-signed JWTs carrying the account id, the username, the
//! issue time and an absolute expiry. Nothing is stored server-side: a token
//! is valid exactly when its signature checks out and it has not expired.
//!
//! Verification failures all surface as the same [`TokenError`]. The reason
//! (malformed, bad signature, expired) is kept on the error for logging and
//! never reaches its `Display` output.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AuthSettings, SettingsError};

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub sub: Uuid,
    /// Username at issue time
    pub username: String,
    /// Issued at time (seconds since the epoch)
    pub iat: i64,
    /// Expiration time (seconds since the epoch)
    pub exp: i64,
}

impl Claims {
    pub fn account_id(&self) -> Uuid {
        self.sub
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Why a token was refused; for logs only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    Malformed,
    BadSignature,
    Expired,
}

/// Opaque token verification failure
#[derive(Debug, Error)]
#[error("invalid token")]
pub struct TokenError {
    reason: TokenFailure,
}

impl TokenError {
    fn new(reason: TokenFailure) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> TokenFailure {
        self.reason
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        let reason = match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenFailure::BadSignature,
            ErrorKind::ExpiredSignature => TokenFailure::Expired,
            _ => TokenFailure::Malformed,
        };
        Self::new(reason)
    }
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token codec, built once at startup from the signing secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Initialize a new codec; refuses an unusable secret
    pub fn new(settings: &AuthSettings) -> Result<Self, SettingsError> {
        settings.validate()?;

        let secret = settings.signing_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify_at` after the signature, against an
        // explicit clock and without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::from_secs(settings.token_ttl_secs),
        })
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for an account, valid from now
    pub fn issue(&self, account_id: Uuid, username: &str) -> Result<IssuedToken> {
        self.issue_at(account_id, username, Utc::now())
    }

    /// Issue a token as if it were `issued_at`
    pub fn issue_at(
        &self,
        account_id: Uuid,
        username: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let ttl = chrono::Duration::from_std(self.ttl)?;
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow!("token expiry is out of range"))?;

        let claims = Claims {
            sub: account_id,
            username: username.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token's signature, then its expiry relative to `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::new(TokenFailure::Expired));
        }

        Ok(claims)
    }
}
