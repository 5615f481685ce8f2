//! Business operations behind the HTTP handlers

pub mod account;
pub mod collaboration;

pub use account::{AccountService, LoginOutcome};
pub use collaboration::CollaborationService;
