//! User-account service: registration, login, profiles and collaborations
//!
//! The authentication core is made of four parts:
//! - [`policy`]: password strength rules
//! - [`hashing`]: Argon2id credential hashing
//! - [`jwt`]: HS256 token issuing and verification
//! - [`gate`]: the authenticate-or-reject entry point for protected routes

pub mod config;
pub mod error;
pub mod gate;
pub mod hashing;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

pub use state::AppState;
