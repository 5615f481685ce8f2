//! Credential hashing with Argon2id
//!
//! Every hash carries its own random salt and cost parameters in PHC format,
//! so verification never needs anything but the stored string. Verification
//! re-derives with the stored parameters and compares in constant time.

use argon2::{
    Algorithm, Argon2, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;
use tracing::error;

use crate::config::{HashingSettings, SettingsError};

/// Infrastructure failures while hashing
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way password hasher
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl CredentialHasher {
    /// Build a hasher from the configured cost parameters
    pub fn new(settings: &HashingSettings) -> Result<Self, SettingsError> {
        let params = settings.params()?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        // Hash of a random throwaway password with the live parameters, so
        // failed lookups pay the same verification cost as real accounts.
        let throwaway: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let decoy_hash = hash_with(&argon2, &throwaway)
            .map_err(|e| SettingsError::InvalidHashing(e.to_string()))?;

        Ok(Self { argon2, decoy_hash })
    }

    /// Hash a plaintext password into a PHC string
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        hash_with(&self.argon2, plaintext)
    }

    /// Check a plaintext password against a stored hash
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Stored password hash is unreadable: {}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend a full verification on a hash that never matches
    pub fn verify_decoy(&self, plaintext: &str) -> bool {
        self.verify(plaintext, &self.decoy_hash);
        false
    }

    /// [`Self::hash`] on the blocking thread pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, HashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await?
    }

    /// [`Self::verify`] on the blocking thread pool
    pub async fn verify_blocking(&self, plaintext: String, hash: String) -> Result<bool, HashError> {
        let hasher = self.clone();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash)).await?;
        Ok(matched)
    }

    /// [`Self::verify_decoy`] on the blocking thread pool
    pub async fn verify_decoy_blocking(&self, plaintext: String) -> Result<bool, HashError> {
        let hasher = self.clone();
        let matched = tokio::task::spawn_blocking(move || hasher.verify_decoy(&plaintext)).await?;
        Ok(matched)
    }
}

fn hash_with(argon2: &Argon2<'_>, plaintext: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| HashError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}
