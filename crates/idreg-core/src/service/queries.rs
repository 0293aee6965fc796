//! Read-side queries: identities, members, users.

use crate::{errors::*, types::*};
use idreg_storage::{
    decode_value, Storage, CF_IDENTITIES, CF_MEMBERSHIPS, CF_MEMBERSHIPS_BY_SENDER, CF_USERS,
};

use super::IdentityRegistryService;

impl<S> IdentityRegistryService<S>
where
    S: Storage + 'static,
{
    /// Get an identity by name
    pub(crate) async fn get_identity_internal(
        &self,
        identity_name: &str,
    ) -> Result<Option<IdentityRecord>> {
        Ok(self
            .storage
            .get(CF_IDENTITIES, &identity_name.to_string())
            .await?)
    }

    /// List all memberships on an identity
    pub(crate) async fn list_members_internal(&self, identity_name: &str) -> Result<Vec<Membership>> {
        let rows: Vec<(Vec<u8>, Membership)> = self
            .storage
            .get_by_prefix(CF_MEMBERSHIPS, &identity_name.to_string())
            .await?;

        Ok(rows.into_iter().map(|(_, membership)| membership).collect())
    }

    /// Get a user by sender
    pub(crate) async fn get_user_internal(&self, sender: &str) -> Result<Option<User>> {
        Ok(self.storage.get(CF_USERS, &sender.to_string()).await?)
    }

    /// List all memberships held by a sender
    pub(crate) async fn list_memberships_for_sender_internal(
        &self,
        sender: &str,
    ) -> Result<Vec<Membership>> {
        let index: Vec<(Vec<u8>, ())> = self
            .storage
            .get_by_prefix(CF_MEMBERSHIPS_BY_SENDER, &sender.to_string())
            .await?;

        let mut memberships = Vec::with_capacity(index.len());
        for (key_bytes, _) in index {
            // Index key is the bincode-encoded (sender, identity_name) tuple
            let (_, identity_name): (String, String) = decode_value(&key_bytes)?;
            let key = (identity_name, sender.to_string());
            let membership: Option<Membership> = self.storage.get(CF_MEMBERSHIPS, &key).await?;
            memberships.extend(membership);
        }

        Ok(memberships)
    }
}
