//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    config::{Settings, SettingsError},
    gate::AuthGate,
    hashing::CredentialHasher,
    jwt::TokenCodec,
    middleware::RequestLogger,
    repositories::{AccountDirectory, CollaborationStore},
    service::{AccountService, CollaborationService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub collaborations: CollaborationService,
    pub gate: AuthGate,
    pub request_logger: Arc<dyn RequestLogger>,
}

impl AppState {
    /// Wire the services from validated settings and the chosen stores
    pub fn new(
        settings: &Settings,
        directory: Arc<dyn AccountDirectory>,
        store: Arc<dyn CollaborationStore>,
        request_logger: Arc<dyn RequestLogger>,
    ) -> Result<Self, SettingsError> {
        let hasher = CredentialHasher::new(&settings.hashing)?;
        let codec = Arc::new(TokenCodec::new(&settings.auth)?);

        Ok(Self {
            accounts: AccountService::new(directory.clone(), hasher, codec.clone()),
            collaborations: CollaborationService::new(store, directory.clone()),
            gate: AuthGate::new(codec, directory),
            request_logger,
        })
    }
}
