//! Identity registry trait definitions.

use crate::{errors::Result, grammar::IdCommand, outcome::*, types::*};
use async_trait::async_trait;

/// Identity registry subsystem trait
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Handle a raw command from `sender`
    ///
    /// Returns [`Response::Unhandled`] for anything that is not a well-formed
    /// `id` command with a valid name.
    async fn handle(&self, command: &str, sender: &str) -> Result<Response>;

    /// Classify `sender`'s relationship to `identity_name` without mutating anything
    async fn resolve(&self, identity_name: &str, sender: &str) -> Result<Resolution>;

    /// Apply a parsed command against a resolution
    ///
    /// The mutation is committed only if the rows in `resolution` are still
    /// current; a lost race surfaces as a storage conflict.
    async fn apply(
        &self,
        resolution: &Resolution,
        command: &IdCommand,
        sender: &str,
    ) -> Result<Outcome>;

    // ========================================================================
    // Read-side queries
    // ========================================================================

    /// Get identity by name
    async fn get_identity(&self, identity_name: &str) -> Result<Option<IdentityRecord>>;

    /// List all memberships on an identity
    async fn list_members(&self, identity_name: &str) -> Result<Vec<Membership>>;

    /// Get user by sender
    async fn get_user(&self, sender: &str) -> Result<Option<User>>;

    /// List all memberships held by a sender
    async fn list_memberships_for_sender(&self, sender: &str) -> Result<Vec<Membership>>;
}
