//! Service configuration
//!
//! Settings are read once at startup from an optional `config/accounts.toml`
//! file, then overridden by `ACCOUNTS__<SECTION>__<KEY>` environment
//! variables (for example `ACCOUNTS__AUTH__SIGNING_SECRET`). Everything has a
//! default except the token signing secret, whose absence is fatal.

use std::fmt;

use common::database::DatabaseConfig;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Base name of the optional configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "config/accounts";

/// Prefix of the environment variables that override the file
pub const ENV_PREFIX: &str = "ACCOUNTS";

/// Minimum signing secret length in bytes (the HS256 key size)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const PLACEHOLDER_SECRETS: &[&str] = &["secret", "changeme", "change-me", "default", "jwt-secret"];

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Token signing secret is not configured (set {}__AUTH__SIGNING_SECRET)", ENV_PREFIX)]
    MissingSigningSecret,

    #[error("Token signing secret is too weak: {0}")]
    WeakSigningSecret(String),

    #[error("Token TTL must be between 1 and {} seconds", MAX_TOKEN_TTL_SECS)]
    InvalidTokenTtl,

    #[error("Invalid password hashing parameters: {0}")]
    InvalidHashing(String),
}

/// Full service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseConfig,
    pub auth: AuthSettings,
    pub hashing: HashingSettings,
}

impl Settings {
    /// Load and validate the configuration
    pub fn load() -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check the rules serde cannot express
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.auth.validate()?;
        self.hashing.params()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Token signing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC key for HS256 token signatures
    pub signing_secret: SigningSecret,
    /// Token lifetime in seconds (default: 24 hours)
    pub token_ttl_secs: u64,
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let secret = self.signing_secret.0.trim();
        if secret.is_empty() {
            return Err(SettingsError::MissingSigningSecret);
        }

        if PLACEHOLDER_SECRETS
            .iter()
            .any(|placeholder| secret.eq_ignore_ascii_case(placeholder))
        {
            return Err(SettingsError::WeakSigningSecret(
                "placeholder value".to_string(),
            ));
        }

        if self.signing_secret.0.len() < MIN_SECRET_LENGTH {
            return Err(SettingsError::WeakSigningSecret(format!(
                "must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(SettingsError::InvalidTokenTtl);
        }

        Ok(())
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            signing_secret: SigningSecret::default(),
            token_ttl_secs: 86_400,
        }
    }
}

/// Token signing key; never printed
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl HashingSettings {
    /// Build the Argon2 parameter set
    pub fn params(&self) -> Result<argon2::Params, SettingsError> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| SettingsError::InvalidHashing(e.to_string()))
    }
}

impl Default for HashingSettings {
    // 19 MiB, two passes: roughly 100ms per hash on commodity hardware.
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}
