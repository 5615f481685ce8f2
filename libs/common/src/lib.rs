//! Common library for the account service workspace
//!
//! This crate provides shared functionality used by the services, including
//! PostgreSQL connectivity, migrations and database error handling.

pub mod database;
pub mod error;
