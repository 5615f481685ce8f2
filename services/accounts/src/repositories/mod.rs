//! Persistence interfaces and their implementations
//!
//! The service only talks to the [`AccountDirectory`] and
//! [`CollaborationStore`] traits. Implementations must be safe to call from
//! many requests at once and make each call atomic.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, Collaboration, Document, ProfileFields};

pub mod account;
pub mod collaboration;
pub mod memory;

pub use account::PgAccountDirectory;
pub use collaboration::PgCollaborationStore;
pub use memory::{MemoryAccountDirectory, MemoryCollaborationStore};

/// Repository failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Username uniqueness constraint violated
    #[error("Username is already taken")]
    DuplicateUsername,

    /// No matching record
    #[error("Record not found")]
    NotFound,

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            other => RepositoryError::Storage(other.to_string()),
        }
    }
}

/// Type alias for repository results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Account persistence
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Persist a new account; fails with `DuplicateUsername` on a taken handle
    async fn create_account(&self, account: &Account) -> RepositoryResult<Account>;

    /// Find an account by its exact username
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Account>;

    /// Find an account by ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Account>;

    /// Replace the display fields and refresh `updated_at`
    async fn update_profile(&self, id: Uuid, fields: &ProfileFields) -> RepositoryResult<Account>;

    /// Remove an account
    async fn delete_account(&self, id: Uuid) -> RepositoryResult<()>;

    /// Case-insensitive username substring search, ordered by username
    async fn search_by_username(&self, fragment: &str, limit: i64) -> RepositoryResult<Vec<Account>>;
}

/// Collaboration persistence
#[async_trait]
pub trait CollaborationStore: Send + Sync {
    /// Persist a collaboration together with its member list
    async fn create(&self, collaboration: &Collaboration) -> RepositoryResult<Collaboration>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Collaboration>;

    /// Collaborations the account belongs to, newest first
    async fn list_for_account(&self, account_id: Uuid) -> RepositoryResult<Vec<Collaboration>>;

    /// Collaborations in a project that the account belongs to, newest first
    async fn list_for_project(
        &self,
        project_id: i64,
        account_id: Uuid,
    ) -> RepositoryResult<Vec<Collaboration>>;

    /// Add a member; adding an existing member is a no-op
    async fn add_member(&self, id: Uuid, account_id: Uuid) -> RepositoryResult<()>;

    /// Remove a member; `NotFound` if the account was not a member
    async fn remove_member(&self, id: Uuid, account_id: Uuid) -> RepositoryResult<()>;

    async fn add_document(&self, document: &Document) -> RepositoryResult<Document>;

    /// Documents of a collaboration, oldest first
    async fn list_documents(&self, id: Uuid) -> RepositoryResult<Vec<Document>>;
}

/// Escape `LIKE` wildcards so a search fragment matches literally
pub(crate) fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
