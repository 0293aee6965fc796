//! Identity status resolution.

use crate::{errors::*, types::*};
use idreg_storage::{
    decode_value, encode_key, Storage, CF_IDENTITIES, CF_MEMBERSHIPS, CF_USERS,
};
use tracing::debug;

use super::IdentityRegistryService;

impl<S> IdentityRegistryService<S>
where
    S: Storage + 'static,
{
    /// Classify `sender` against `identity_name`
    ///
    /// Identity, the caller's own membership and the caller's user row come
    /// from one consistent multi-key read. Memberships of other senders are
    /// never consulted: no own membership means TAKEN.
    pub(crate) async fn resolve_internal(
        &self,
        identity_name: &str,
        sender: &str,
    ) -> Result<Resolution> {
        let membership_key = (identity_name.to_string(), sender.to_string());
        let mut rows = self
            .storage
            .multi_get_raw(vec![
                (CF_IDENTITIES, encode_key(identity_name)?),
                (CF_MEMBERSHIPS, encode_key(&membership_key)?),
                (CF_USERS, encode_key(sender)?),
            ])
            .await?
            .into_iter();

        let identity: Option<IdentityRecord> = decode_row(rows.next())?;
        let membership: Option<Membership> = decode_row(rows.next())?;
        let caller: Option<User> = decode_row(rows.next())?;

        let status = match (&identity, membership) {
            (None, _) => IdentityStatus::Available,
            (Some(_), None) => IdentityStatus::Taken,
            (Some(identity), Some(membership)) => IdentityStatus::Existing(Standing {
                role: membership.membership_type,
                enabled: identity.enabled,
                identity_name: identity.name.clone(),
                membership_type: membership.membership_type,
                primary_identity_name: caller
                    .as_ref()
                    .and_then(|u| u.primary_identity_name.clone()),
            }),
        };

        debug!(identity = %identity_name, sender = %sender, ?status, "Resolved identity status");

        Ok(Resolution {
            status,
            identity,
            caller,
        })
    }
}

fn decode_row<V: serde::de::DeserializeOwned>(row: Option<Option<Vec<u8>>>) -> Result<Option<V>> {
    match row.flatten() {
        Some(bytes) => Ok(Some(decode_value(&bytes)?)),
        None => Ok(None),
    }
}
