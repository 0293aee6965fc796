//! Identity registry service implementation.

mod dispatcher;
mod engine;
mod locks;
mod queries;
mod resolver;

use crate::{config::RegistryConfig, errors::*, grammar::IdCommand, outcome::*, traits::*, types::*};
use async_trait::async_trait;
use std::sync::Arc;
use idreg_storage::Storage;
use locks::NameLocks;

/// Identity registry service implementation
pub struct IdentityRegistryService<S>
where
    S: Storage,
{
    pub(super) storage: Arc<S>,
    pub(super) config: RegistryConfig,
    name_locks: NameLocks,
}

impl<S> IdentityRegistryService<S>
where
    S: Storage,
{
    /// Create a new registry service with default configuration
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_config(storage, RegistryConfig::default())
    }

    /// Create a new registry service
    pub fn with_config(storage: Arc<S>, config: RegistryConfig) -> Self {
        Self {
            storage,
            config,
            name_locks: NameLocks::default(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

#[async_trait]
impl<S> IdentityRegistry for IdentityRegistryService<S>
where
    S: Storage + 'static,
{
    async fn handle(&self, command: &str, sender: &str) -> Result<Response> {
        self.handle_internal(command, sender).await
    }

    async fn resolve(&self, identity_name: &str, sender: &str) -> Result<Resolution> {
        self.resolve_internal(identity_name, sender).await
    }

    async fn apply(
        &self,
        resolution: &Resolution,
        command: &IdCommand,
        sender: &str,
    ) -> Result<Outcome> {
        self.apply_internal(resolution, command, sender).await
    }

    async fn get_identity(&self, identity_name: &str) -> Result<Option<IdentityRecord>> {
        self.get_identity_internal(identity_name).await
    }

    async fn list_members(&self, identity_name: &str) -> Result<Vec<Membership>> {
        self.list_members_internal(identity_name).await
    }

    async fn get_user(&self, sender: &str) -> Result<Option<User>> {
        self.get_user_internal(sender).await
    }

    async fn list_memberships_for_sender(&self, sender: &str) -> Result<Vec<Membership>> {
        self.list_memberships_for_sender_internal(sender).await
    }
}
