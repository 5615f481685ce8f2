//! PostgreSQL account directory

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{AccountDirectory, RepositoryError, RepositoryResult, escape_like};
use crate::models::{Account, ProfileFields};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
                               avatar_url, created_at, updated_at";

/// Account directory backed by the `accounts` table
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    /// Create a new account directory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn create_account(&self, account: &Account) -> RepositoryResult<Account> {
        info!("Creating account: {}", account.username);

        let query = format!(
            r#"
            INSERT INTO accounts ({ACCOUNT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(account.id)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.avatar_url)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_unique_violation() => RepositoryError::DuplicateUsername,
                _ => RepositoryError::from(e),
            })
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Account> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");

        sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Account> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_profile(&self, id: Uuid, fields: &ProfileFields) -> RepositoryResult<Account> {
        info!("Updating profile of account: {}", id);

        let query = format!(
            r#"
            UPDATE accounts
            SET first_name = $2, last_name = $3, avatar_url = $4, updated_at = $5
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .bind(&fields.avatar_url)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_account(&self, id: Uuid) -> RepositoryResult<()> {
        info!("Deleting account: {}", id);

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn search_by_username(&self, fragment: &str, limit: i64) -> RepositoryResult<Vec<Account>> {
        let query = format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE username ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY username
            LIMIT $2
            "#
        );

        let accounts = sqlx::query_as::<_, Account>(&query)
            .bind(escape_like(fragment))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }
}
