//! Account model and related functionality

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{validate_display_field, validate_email, validate_username};

/// Account entity as stored in the directory
///
/// `password_hash` always holds an Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The mutable display fields of this account
    pub fn profile_fields(&self) -> ProfileFields {
        ProfileFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Display fields, the only part of an account a profile update may change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
}

/// Registration payload
#[derive(Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl RegisterRequest {
    /// Check the non-password fields. Password strength is the policy's job.
    pub fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_display_field("First name", &self.first_name)?;
        validate_display_field("Last name", &self.last_name)?;
        validate_display_field("Avatar URL", &self.avatar_url)?;
        Ok(())
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Profile update payload; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(first_name) = &self.first_name {
            validate_display_field("First name", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_display_field("Last name", last_name)?;
        }
        if let Some(avatar_url) = &self.avatar_url {
            validate_display_field("Avatar URL", avatar_url)?;
        }
        Ok(())
    }

    /// Merge this update over the current display fields
    pub fn apply(self, current: ProfileFields) -> ProfileFields {
        ProfileFields {
            first_name: self.first_name.unwrap_or(current.first_name),
            last_name: self.last_name.unwrap_or(current.last_name),
            avatar_url: self.avatar_url.unwrap_or(current.avatar_url),
        }
    }
}

/// User login credentials, only alive for the duration of a login call
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            avatar_url: account.avatar_url.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self::from(&account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "Str0ng!Pass".to_string(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            avatar_url: String::new(),
        }
    }

    #[test]
    fn test_debug_output_redacts_passwords() {
        let credentials = Credentials {
            username: "alice".to_string(),
            password: "Str0ng!Pass".to_string(),
        };
        let rendered = format!("{:?} {:?}", credentials, register_request());
        assert!(!rendered.contains("Str0ng!Pass"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_register_request_rejects_bad_email() {
        let mut request = register_request();
        request.email = "not-an-email".to_string();
        assert_eq!(request.validate(), Err("Invalid email format".to_string()));
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let current = ProfileFields {
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            avatar_url: "https://example.com/a.png".to_string(),
        };
        let update = UpdateProfileRequest {
            last_name: Some("Smith".to_string()),
            ..UpdateProfileRequest::default()
        };

        let merged = update.apply(current);
        assert_eq!(merged.first_name, "Alice");
        assert_eq!(merged.last_name, "Smith");
        assert_eq!(merged.avatar_url, "https://example.com/a.png");
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            avatar_url: String::new(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(AccountProfile::from(&account)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
