//! Database failures surfaced by the common library

use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The pool could not reach PostgreSQL
    #[error("Failed to connect to PostgreSQL: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("PostgreSQL query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// A schema migration failed or the applied history diverged
    #[error("Failed to apply migrations: {0}")]
    Migration(#[source] MigrateError),

    #[error("Invalid database configuration: {0}")]
    Configuration(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
