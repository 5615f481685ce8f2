//! In-memory stores, used by tests and local runs without PostgreSQL

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountDirectory, CollaborationStore, RepositoryError, RepositoryResult};
use crate::models::{Account, Collaboration, Document, ProfileFields};

/// Account directory held in a map keyed by account ID
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn create_account(&self, account: &Account) -> RepositoryResult<Account> {
        let mut accounts = self.accounts.write().await;

        // Checked under the write lock, like a unique index.
        if accounts.values().any(|a| a.username == account.username) {
            return Err(RepositoryError::DuplicateUsername);
        }
        if accounts.contains_key(&account.id) {
            return Err(RepositoryError::Storage(format!(
                "duplicate account id {}",
                account.id
            )));
        }

        accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Account> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.username == username)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Account> {
        self.accounts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_profile(&self, id: Uuid, fields: &ProfileFields) -> RepositoryResult<Account> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        account.first_name = fields.first_name.clone();
        account.last_name = fields.last_name.clone();
        account.avatar_url = fields.avatar_url.clone();
        account.updated_at = Utc::now();

        Ok(account.clone())
    }

    async fn delete_account(&self, id: Uuid) -> RepositoryResult<()> {
        self.accounts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn search_by_username(&self, fragment: &str, limit: i64) -> RepositoryResult<Vec<Account>> {
        let needle = fragment.to_lowercase();
        let mut matches: Vec<Account> = self
            .accounts
            .read()
            .await
            .values()
            .filter(|a| a.username.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matches)
    }
}

#[derive(Default)]
struct CollaborationData {
    collaborations: HashMap<Uuid, Collaboration>,
    documents: Vec<Document>,
}

/// Collaboration store held in memory
#[derive(Default)]
pub struct MemoryCollaborationStore {
    data: RwLock<CollaborationData>,
}

impl MemoryCollaborationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut collaborations: Vec<Collaboration>) -> Vec<Collaboration> {
    collaborations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    collaborations
}

#[async_trait]
impl CollaborationStore for MemoryCollaborationStore {
    async fn create(&self, collaboration: &Collaboration) -> RepositoryResult<Collaboration> {
        let mut stored = collaboration.clone();
        let mut seen = HashSet::new();
        stored.members.retain(|member| seen.insert(*member));

        self.data
            .write()
            .await
            .collaborations
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Collaboration> {
        self.data
            .read()
            .await
            .collaborations
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_for_account(&self, account_id: Uuid) -> RepositoryResult<Vec<Collaboration>> {
        let collaborations = self
            .data
            .read()
            .await
            .collaborations
            .values()
            .filter(|c| c.has_member(account_id))
            .cloned()
            .collect();
        Ok(newest_first(collaborations))
    }

    async fn list_for_project(
        &self,
        project_id: i64,
        account_id: Uuid,
    ) -> RepositoryResult<Vec<Collaboration>> {
        let collaborations = self
            .data
            .read()
            .await
            .collaborations
            .values()
            .filter(|c| c.project_id == project_id && c.has_member(account_id))
            .cloned()
            .collect();
        Ok(newest_first(collaborations))
    }

    async fn add_member(&self, id: Uuid, account_id: Uuid) -> RepositoryResult<()> {
        let mut data = self.data.write().await;
        let collaboration = data
            .collaborations
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        if !collaboration.has_member(account_id) {
            collaboration.members.push(account_id);
            collaboration.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_member(&self, id: Uuid, account_id: Uuid) -> RepositoryResult<()> {
        let mut data = self.data.write().await;
        let collaboration = data
            .collaborations
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        let before = collaboration.members.len();
        collaboration.members.retain(|member| *member != account_id);
        if collaboration.members.len() == before {
            return Err(RepositoryError::NotFound);
        }

        collaboration.updated_at = Utc::now();
        Ok(())
    }

    async fn add_document(&self, document: &Document) -> RepositoryResult<Document> {
        let mut data = self.data.write().await;
        if !data.collaborations.contains_key(&document.collaboration_id) {
            return Err(RepositoryError::NotFound);
        }

        data.documents.push(document.clone());
        Ok(document.clone())
    }

    async fn list_documents(&self, id: Uuid) -> RepositoryResult<Vec<Document>> {
        let documents = self
            .data
            .read()
            .await
            .documents
            .iter()
            .filter(|d| d.collaboration_id == id)
            .cloned()
            .collect();
        Ok(documents)
    }
}
