//! Registration, login and profile management

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    hashing::CredentialHasher,
    jwt::{IssuedToken, TokenCodec},
    models::{Account, Credentials, RegisterRequest, UpdateProfileRequest},
    policy,
    repositories::{AccountDirectory, RepositoryError},
};

/// Upper bound on username search results
const SEARCH_LIMIT: i64 = 50;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub token: IssuedToken,
}

#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn AccountDirectory>,
    hasher: CredentialHasher,
    codec: Arc<TokenCodec>,
}

impl AccountService {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        hasher: CredentialHasher,
        codec: Arc<TokenCodec>,
    ) -> Self {
        Self {
            directory,
            hasher,
            codec,
        }
    }

    /// Lifetime of the tokens issued by [`Self::login`]
    pub fn token_ttl(&self) -> Duration {
        self.codec.ttl()
    }

    /// Validate, hash and persist a new account
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<Account> {
        request.validate().map_err(ApiError::BadRequest)?;
        policy::validate(&request.password)?;

        let RegisterRequest {
            username,
            email,
            password,
            first_name,
            last_name,
            avatar_url,
        } = request;

        let password_hash = self.hasher.hash_blocking(password).await?;
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            first_name,
            last_name,
            avatar_url,
            created_at: now,
            updated_at: now,
        };

        let account = self
            .directory
            .create_account(&account)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))?;

        info!("Registered account {} ({})", account.username, account.id);
        Ok(account)
    }

    /// Check credentials and mint a token
    ///
    /// An unknown username and a wrong password both end in
    /// [`ApiError::InvalidCredentials`] after one full hash verification.
    pub async fn login(&self, credentials: Credentials) -> ApiResult<LoginOutcome> {
        let Credentials { username, password } = credentials;

        let account = match self.directory.find_by_username(&username).await {
            Ok(account) => account,
            Err(RepositoryError::NotFound) => {
                self.hasher.verify_decoy_blocking(password).await?;
                warn!("Failed login: unknown account");
                return Err(ApiError::InvalidCredentials);
            }
            Err(e) => return Err(ApiError::from_repository(e, "Account")),
        };

        let matched = self
            .hasher
            .verify_blocking(password, account.password_hash.clone())
            .await?;
        if !matched {
            warn!("Failed login: wrong password for account {}", account.id);
            return Err(ApiError::InvalidCredentials);
        }

        let token = self
            .codec
            .issue(account.id, &account.username)
            .map_err(|e| ApiError::Internal(format!("Failed to issue token: {}", e)))?;

        info!("Account {} logged in", account.id);
        Ok(LoginOutcome { account, token })
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Account> {
        self.directory
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))
    }

    pub async fn get_by_username(&self, username: &str) -> ApiResult<Account> {
        self.directory
            .find_by_username(username)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))
    }

    /// Case-insensitive substring search over usernames
    pub async fn search(&self, fragment: &str) -> ApiResult<Vec<Account>> {
        self.directory
            .search_by_username(fragment.trim(), SEARCH_LIMIT)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))
    }

    /// Update the caller's own display fields
    pub async fn update_profile(
        &self,
        caller: Uuid,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> ApiResult<Account> {
        if caller != id {
            return Err(ApiError::Forbidden);
        }
        request.validate().map_err(ApiError::BadRequest)?;

        let current = self.get(id).await?;
        let fields = request.apply(current.profile_fields());

        self.directory
            .update_profile(id, &fields)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))
    }

    /// Delete the caller's own account
    pub async fn delete(&self, caller: Uuid, id: Uuid) -> ApiResult<()> {
        if caller != id {
            return Err(ApiError::Forbidden);
        }

        self.directory
            .delete_account(id)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))?;

        info!("Deleted account {}", id);
        Ok(())
    }
}
