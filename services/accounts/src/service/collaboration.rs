//! Collaboration bookkeeping
//!
//! Every operation acts on behalf of an authenticated caller, and only
//! members of a collaboration may read or change it.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Collaboration, CreateCollaborationRequest, CreateDocumentRequest, Document},
    repositories::{AccountDirectory, CollaborationStore},
};

#[derive(Clone)]
pub struct CollaborationService {
    store: Arc<dyn CollaborationStore>,
    directory: Arc<dyn AccountDirectory>,
}

impl CollaborationService {
    pub fn new(store: Arc<dyn CollaborationStore>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self { store, directory }
    }

    /// Create a collaboration with the caller as its first member
    pub async fn create(
        &self,
        caller: Uuid,
        request: CreateCollaborationRequest,
    ) -> ApiResult<Collaboration> {
        request.validate().map_err(ApiError::BadRequest)?;

        let mut members = vec![caller];
        for member in request.members {
            if members.contains(&member) {
                continue;
            }
            self.ensure_account(member).await?;
            members.push(member);
        }

        let now = Utc::now();
        let collaboration = Collaboration {
            id: Uuid::new_v4(),
            project_id: request.project_id,
            name: request.name,
            members,
            created_at: now,
            updated_at: now,
        };

        let collaboration = self
            .store
            .create(&collaboration)
            .await
            .map_err(|e| ApiError::from_repository(e, "Account"))?;

        info!(
            "Account {} created collaboration {}",
            caller, collaboration.id
        );
        Ok(collaboration)
    }

    /// Fetch a collaboration the caller belongs to
    pub async fn get(&self, caller: Uuid, id: Uuid) -> ApiResult<Collaboration> {
        let collaboration = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::from_repository(e, "Collaboration"))?;

        if !collaboration.has_member(caller) {
            return Err(ApiError::Forbidden);
        }
        Ok(collaboration)
    }

    pub async fn list_for_caller(&self, caller: Uuid) -> ApiResult<Vec<Collaboration>> {
        self.store
            .list_for_account(caller)
            .await
            .map_err(|e| ApiError::from_repository(e, "Collaboration"))
    }

    pub async fn list_for_project(&self, caller: Uuid, project_id: i64) -> ApiResult<Vec<Collaboration>> {
        self.store
            .list_for_project(project_id, caller)
            .await
            .map_err(|e| ApiError::from_repository(e, "Collaboration"))
    }

    /// Add an existing account; inviting a current member changes nothing
    pub async fn invite(&self, caller: Uuid, id: Uuid, account_id: Uuid) -> ApiResult<Collaboration> {
        let collaboration = self.get(caller, id).await?;
        if collaboration.has_member(account_id) {
            return Ok(collaboration);
        }

        self.ensure_account(account_id).await?;
        self.store
            .add_member(id, account_id)
            .await
            .map_err(|e| ApiError::from_repository(e, "Collaboration"))?;

        self.get(caller, id).await
    }

    pub async fn remove_member(&self, caller: Uuid, id: Uuid, account_id: Uuid) -> ApiResult<()> {
        self.get(caller, id).await?;

        self.store
            .remove_member(id, account_id)
            .await
            .map_err(|e| ApiError::from_repository(e, "Member"))
    }

    pub async fn create_document(
        &self,
        caller: Uuid,
        id: Uuid,
        request: CreateDocumentRequest,
    ) -> ApiResult<Document> {
        self.get(caller, id).await?;
        request.validate().map_err(ApiError::BadRequest)?;

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            collaboration_id: id,
            name: request.name,
            title: request.title,
            content: request.content,
            created_at: now,
            updated_at: now,
        };

        self.store
            .add_document(&document)
            .await
            .map_err(|e| ApiError::from_repository(e, "Collaboration"))
    }

    pub async fn list_documents(&self, caller: Uuid, id: Uuid) -> ApiResult<Vec<Document>> {
        self.get(caller, id).await?;

        self.store
            .list_documents(id)
            .await
            .map_err(|e| ApiError::from_repository(e, "Collaboration"))
    }

    async fn ensure_account(&self, account_id: Uuid) -> ApiResult<()> {
        self.directory
            .find_by_id(account_id)
            .await
            .map(|_| ())
            .map_err(|e| ApiError::from_repository(e, "Account"))
    }
}
