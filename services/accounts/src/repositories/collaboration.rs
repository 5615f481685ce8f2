//! PostgreSQL collaboration store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{CollaborationStore, RepositoryError, RepositoryResult};
use crate::models::{Collaboration, Document};

#[derive(FromRow)]
struct CollaborationRow {
    id: Uuid,
    project_id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CollaborationRow {
    fn with_members(self, members: Vec<Uuid>) -> Collaboration {
        Collaboration {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Collaboration store backed by the `collaborations`, `collaboration_members`
/// and `documents` tables
#[derive(Clone)]
pub struct PgCollaborationStore {
    pool: PgPool,
}

impl PgCollaborationStore {
    /// Create a new collaboration store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn members_of(&self, id: Uuid) -> RepositoryResult<Vec<Uuid>> {
        let members = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT account_id
            FROM collaboration_members
            WHERE collaboration_id = $1
            ORDER BY joined_at, account_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn attach_members(&self, rows: Vec<CollaborationRow>) -> RepositoryResult<Vec<Collaboration>> {
        let mut collaborations = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.members_of(row.id).await?;
            collaborations.push(row.with_members(members));
        }
        Ok(collaborations)
    }
}

#[async_trait]
impl CollaborationStore for PgCollaborationStore {
    async fn create(&self, collaboration: &Collaboration) -> RepositoryResult<Collaboration> {
        info!(
            "Creating collaboration {} in project {}",
            collaboration.id, collaboration.project_id
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collaborations (id, project_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(collaboration.id)
        .bind(collaboration.project_id)
        .bind(&collaboration.name)
        .bind(collaboration.created_at)
        .bind(collaboration.updated_at)
        .execute(&mut *tx)
        .await?;

        for member in &collaboration.members {
            sqlx::query(
                r#"
                INSERT INTO collaboration_members (collaboration_id, account_id, joined_at)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(collaboration.id)
            .bind(member)
            .bind(collaboration.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_foreign_key_violation() => RepositoryError::NotFound,
                _ => RepositoryError::from(e),
            })?;
        }

        tx.commit().await?;

        self.find_by_id(collaboration.id).await
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Collaboration> {
        let row = sqlx::query_as::<_, CollaborationRow>(
            r#"
            SELECT id, project_id, name, created_at, updated_at
            FROM collaborations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let members = self.members_of(row.id).await?;
        Ok(row.with_members(members))
    }

    async fn list_for_account(&self, account_id: Uuid) -> RepositoryResult<Vec<Collaboration>> {
        let rows = sqlx::query_as::<_, CollaborationRow>(
            r#"
            SELECT c.id, c.project_id, c.name, c.created_at, c.updated_at
            FROM collaborations c
            JOIN collaboration_members m ON m.collaboration_id = c.id
            WHERE m.account_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_members(rows).await
    }

    async fn list_for_project(
        &self,
        project_id: i64,
        account_id: Uuid,
    ) -> RepositoryResult<Vec<Collaboration>> {
        let rows = sqlx::query_as::<_, CollaborationRow>(
            r#"
            SELECT c.id, c.project_id, c.name, c.created_at, c.updated_at
            FROM collaborations c
            JOIN collaboration_members m ON m.collaboration_id = c.id
            WHERE c.project_id = $1 AND m.account_id = $2
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(project_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_members(rows).await
    }

    async fn add_member(&self, id: Uuid, account_id: Uuid) -> RepositoryResult<()> {
        info!("Adding account {} to collaboration {}", account_id, id);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collaboration_members (collaboration_id, account_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(account_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => RepositoryError::NotFound,
            _ => RepositoryError::from(e),
        })?;

        sqlx::query("UPDATE collaborations SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_member(&self, id: Uuid, account_id: Uuid) -> RepositoryResult<()> {
        info!("Removing account {} from collaboration {}", account_id, id);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM collaboration_members
            WHERE collaboration_id = $1 AND account_id = $2
            "#,
        )
        .bind(id)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE collaborations SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_document(&self, document: &Document) -> RepositoryResult<Document> {
        info!(
            "Adding document {} to collaboration {}",
            document.id, document.collaboration_id
        );

        sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, collaboration_id, name, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, collaboration_id, name, title, content, created_at, updated_at
            "#,
        )
        .bind(document.id)
        .bind(document.collaboration_id)
        .bind(&document.name)
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => RepositoryError::NotFound,
            _ => RepositoryError::from(e),
        })
    }

    async fn list_documents(&self, id: Uuid) -> RepositoryResult<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, collaboration_id, name, title, content, created_at, updated_at
            FROM documents
            WHERE collaboration_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }
}
