//! Collaboration and document models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{validate_display_field, validate_required};

/// A named group of accounts inside a project
#[derive(Debug, Clone, Serialize)]
pub struct Collaboration {
    pub id: Uuid,
    pub project_id: i64,
    pub name: String,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collaboration {
    pub fn has_member(&self, account_id: Uuid) -> bool {
        self.members.contains(&account_id)
    }
}

/// Document shared within a collaboration
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub collaboration_id: Uuid,
    pub name: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collaboration creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollaborationRequest {
    pub project_id: i64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

impl CreateCollaborationRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_required("Name", &self.name)?;
        validate_display_field("Name", &self.name)
    }
}

/// Member invitation payload
#[derive(Debug, Clone, Deserialize)]
pub struct InviteMemberRequest {
    pub account_id: Uuid,
}

/// Document creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl CreateDocumentRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_required("Name", &self.name)?;
        validate_display_field("Name", &self.name)?;
        validate_display_field("Title", &self.title)
    }
}
