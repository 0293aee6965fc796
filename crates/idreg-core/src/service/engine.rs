//! Lifecycle and role engine.
//!
//! Every command is planned in memory against the rows read for it and
//! then written as one guarded batch. The batch expects the identity row
//! exactly as it was read (or its absence, for a claim); since every
//! mutation bumps the identity revision, two concurrent mutations of one
//! identity can never both commit.

use crate::{errors::*, grammar::*, outcome::*, types::*};
use idreg_storage::{
    Batch, BatchExt, Storage, CF_IDENTITIES, CF_MEMBERSHIPS, CF_MEMBERSHIPS_BY_SENDER, CF_USERS,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::IdentityRegistryService;

impl<S> IdentityRegistryService<S>
where
    S: Storage + 'static,
{
    /// Decide and commit the mutation for `command` given the caller's standing
    pub(crate) async fn apply_internal(
        &self,
        resolution: &Resolution,
        command: &IdCommand,
        sender: &str,
    ) -> Result<Outcome> {
        match &resolution.status {
            IdentityStatus::Available => self.claim_identity(resolution, command, sender).await,
            IdentityStatus::Taken => Ok(Outcome::Rejected(Rejection::Taken {
                name: command.name.clone(),
            })),
            IdentityStatus::Existing(standing) if command.is_claim() => {
                self.reclaim_identity(resolution, standing, sender).await
            }
            IdentityStatus::Existing(standing) if !standing.role.is_admin() => {
                Ok(Outcome::Rejected(Rejection::NotAuthorized {
                    name: standing.identity_name.clone(),
                    role: standing.role,
                }))
            }
            IdentityStatus::Existing(_) => {
                let identity = resolution
                    .identity
                    .as_ref()
                    .ok_or_else(|| RegistryError::NotFound(command.name.clone()))?;
                self.administer_identity(identity, command).await
            }
        }
    }

    /// Create a new identity with the caller as its sole admin
    async fn claim_identity(
        &self,
        resolution: &Resolution,
        command: &IdCommand,
        sender: &str,
    ) -> Result<Outcome> {
        let now = current_timestamp();
        let name = command.name.clone();

        let identity = IdentityRecord {
            name: name.clone(),
            enabled: true,
            domain: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        };
        let membership = Membership {
            identity_name: name.clone(),
            user_sender: sender.to_string(),
            membership_type: MembershipType::Admin,
            joined_at: now,
        };

        let mut batch = self.storage.begin_transaction().await?;
        batch.expect_absent(CF_IDENTITIES, &name)?;
        batch.put(CF_IDENTITIES, &name, &identity)?;
        put_membership(batch.as_mut(), &membership)?;

        match &resolution.caller {
            None => {
                let user = User {
                    sender: sender.to_string(),
                    primary_identity_name: Some(name.clone()),
                    created_at: now,
                };
                batch.expect_absent(CF_USERS, &user.sender)?;
                batch.put(CF_USERS, &user.sender, &user)?;
            }
            Some(user) if user.primary_identity_name.is_none() => {
                let updated = User {
                    primary_identity_name: Some(name.clone()),
                    ..user.clone()
                };
                batch.expect_unchanged(CF_USERS, &user.sender, Some(user))?;
                batch.put(CF_USERS, &user.sender, &updated)?;
            }
            Some(_) => {}
        }

        batch.commit().await?;

        if !command.is_claim() {
            debug!(identity = %name, ignored = ?command.modifiers, "Ignored modifiers on claim");
        }
        info!(identity = %name, sender = %sender, "Identity claimed");

        Ok(Outcome::Claimed {
            name,
            ignored: command.modifiers.clone(),
        })
    }

    /// Make a held identity the caller's primary
    ///
    /// Acknowledged without a write when it already is.
    async fn reclaim_identity(
        &self,
        resolution: &Resolution,
        standing: &Standing,
        sender: &str,
    ) -> Result<Outcome> {
        let name = &standing.identity_name;
        if standing.primary_identity_name.as_deref() == Some(name.as_str()) {
            return Ok(Outcome::AlreadyYours {
                name: name.clone(),
                role: standing.role,
            });
        }

        let mut batch = self.storage.begin_transaction().await?;
        // A concurrent remove or destroy changes the identity row
        batch.expect_unchanged(CF_IDENTITIES, name, resolution.identity.as_ref())?;

        match &resolution.caller {
            Some(user) => {
                let updated = User {
                    primary_identity_name: Some(name.clone()),
                    ..user.clone()
                };
                batch.expect_unchanged(CF_USERS, &user.sender, Some(user))?;
                batch.put(CF_USERS, &user.sender, &updated)?;
            }
            None => {
                let user = User {
                    sender: sender.to_string(),
                    primary_identity_name: Some(name.clone()),
                    created_at: current_timestamp(),
                };
                batch.expect_absent(CF_USERS, &user.sender)?;
                batch.put(CF_USERS, &user.sender, &user)?;
            }
        }

        batch.commit().await?;
        info!(identity = %name, sender = %sender, "Primary identity switched");

        Ok(Outcome::Switched {
            name: name.clone(),
            role: standing.role,
        })
    }

    /// Apply an admin's modifiers to an existing identity
    async fn administer_identity(
        &self,
        identity: &IdentityRecord,
        command: &IdCommand,
    ) -> Result<Outcome> {
        let members: BTreeMap<String, Membership> = self
            .list_members_internal(&identity.name)
            .await?
            .into_iter()
            .map(|m| (m.user_sender.clone(), m))
            .collect();

        let mut plan = Plan::new(identity.clone(), members.clone(), current_timestamp());
        if let Err(rejection) = plan.apply_all(&command.modifiers) {
            debug!(identity = %identity.name, %rejection, "Command rejected");
            return Ok(Outcome::Rejected(rejection));
        }

        if plan.destroy {
            self.commit_destroy(identity, &members).await?;
            info!(identity = %identity.name, "Identity destroyed");
            return Ok(Outcome::Destroyed {
                name: identity.name.clone(),
            });
        }

        if !plan.changes.is_empty() {
            self.commit_update(identity, &members, &plan).await?;
            info!(identity = %identity.name, changes = ?plan.changes, "Identity updated");
        }

        Ok(Outcome::Updated {
            name: identity.name.clone(),
            changes: plan.changes,
        })
    }

    async fn commit_update(
        &self,
        original: &IdentityRecord,
        before: &BTreeMap<String, Membership>,
        plan: &Plan,
    ) -> Result<()> {
        let name = &original.name;

        // Reads first; the batch itself is write-only
        let mut new_users = Vec::new();
        for sender in plan.members.keys().filter(|s| !before.contains_key(*s)) {
            if self.get_user_internal(sender).await?.is_none() {
                new_users.push(User {
                    sender: sender.clone(),
                    primary_identity_name: None,
                    created_at: plan.now,
                });
            }
        }

        let removed: Vec<&Membership> = before
            .values()
            .filter(|m| !plan.members.contains_key(&m.user_sender))
            .collect();
        let removed_senders: Vec<&str> = removed.iter().map(|m| m.user_sender.as_str()).collect();
        let primaries = self.users_with_primary(&removed_senders, name).await?;

        let mut updated = plan.identity.clone();
        updated.revision = original.revision + 1;
        updated.updated_at = plan.now;

        let mut batch = self.storage.begin_transaction().await?;
        batch.expect_unchanged(CF_IDENTITIES, name, Some(original))?;
        batch.put(CF_IDENTITIES, name, &updated)?;

        for membership in plan.members.values() {
            if before.get(&membership.user_sender) != Some(membership) {
                put_membership(batch.as_mut(), membership)?;
            }
        }
        for membership in removed {
            delete_membership(batch.as_mut(), membership)?;
        }
        for user in &new_users {
            batch.expect_absent(CF_USERS, &user.sender)?;
            batch.put(CF_USERS, &user.sender, user)?;
        }
        clear_primaries(batch.as_mut(), &primaries)?;

        batch.commit().await?;
        Ok(())
    }

    async fn commit_destroy(
        &self,
        original: &IdentityRecord,
        members: &BTreeMap<String, Membership>,
    ) -> Result<()> {
        let name = &original.name;
        let senders: Vec<&str> = members.keys().map(String::as_str).collect();
        let primaries = self.users_with_primary(&senders, name).await?;

        let mut batch = self.storage.begin_transaction().await?;
        batch.expect_unchanged(CF_IDENTITIES, name, Some(original))?;
        batch.delete(CF_IDENTITIES, name)?;
        for membership in members.values() {
            delete_membership(batch.as_mut(), membership)?;
        }
        clear_primaries(batch.as_mut(), &primaries)?;

        batch.commit().await?;
        Ok(())
    }

    /// Users among `senders` whose primary identity is `identity_name`
    async fn users_with_primary(&self, senders: &[&str], identity_name: &str) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for sender in senders {
            if let Some(user) = self.get_user_internal(sender).await? {
                if user.primary_identity_name.as_deref() == Some(identity_name) {
                    users.push(user);
                }
            }
        }
        Ok(users)
    }
}

fn put_membership(batch: &mut dyn Batch, membership: &Membership) -> Result<()> {
    let key = (membership.identity_name.clone(), membership.user_sender.clone());
    let index_key = (membership.user_sender.clone(), membership.identity_name.clone());
    batch.put(CF_MEMBERSHIPS, &key, membership)?;
    batch.put(CF_MEMBERSHIPS_BY_SENDER, &index_key, &())?;
    Ok(())
}

fn delete_membership(batch: &mut dyn Batch, membership: &Membership) -> Result<()> {
    let key = (membership.identity_name.clone(), membership.user_sender.clone());
    let index_key = (membership.user_sender.clone(), membership.identity_name.clone());
    batch.delete(CF_MEMBERSHIPS, &key)?;
    batch.delete(CF_MEMBERSHIPS_BY_SENDER, &index_key)?;
    Ok(())
}

fn clear_primaries(batch: &mut dyn Batch, users: &[User]) -> Result<()> {
    for user in users {
        let cleared = User {
            primary_identity_name: None,
            ..user.clone()
        };
        batch.expect_unchanged(CF_USERS, &user.sender, Some(user))?;
        batch.put(CF_USERS, &user.sender, &cleared)?;
    }
    Ok(())
}

/// In-memory result of applying one command's modifiers
#[derive(Debug)]
struct Plan {
    identity: IdentityRecord,
    members: BTreeMap<String, Membership>,
    changes: Vec<Change>,
    destroy: bool,
    now: u64,
}

impl Plan {
    fn new(identity: IdentityRecord, members: BTreeMap<String, Membership>, now: u64) -> Self {
        Self {
            identity,
            members,
            changes: Vec::new(),
            destroy: false,
            now,
        }
    }

    /// Role changes first, then the admin invariant, then settings and lifecycle
    fn apply_all(&mut self, modifiers: &[Modifier]) -> std::result::Result<(), Rejection> {
        let (roles, settings): (Vec<&Modifier>, Vec<&Modifier>) =
            modifiers.iter().partition(|m| m.is_role_change());

        for modifier in roles {
            self.apply_role(modifier)?;
        }
        if !self.members.values().any(|m| m.membership_type.is_admin()) {
            return Err(Rejection::NoAdminLeft {
                name: self.identity.name.clone(),
            });
        }

        for modifier in settings {
            self.apply_setting(modifier)?;
        }
        Ok(())
    }

    fn apply_role(&mut self, modifier: &Modifier) -> std::result::Result<(), Rejection> {
        match modifier {
            Modifier::GrantMember(sender) => self.grant(sender, MembershipType::Member),
            Modifier::GrantAdmin(sender) => self.grant(sender, MembershipType::Admin),
            Modifier::Remove(sender) => {
                if self.members.remove(sender).is_none() {
                    return Err(Rejection::NotAMember {
                        name: self.identity.name.clone(),
                        sender: sender.clone(),
                    });
                }
                self.changes.push(Change::Removed(sender.clone()));
            }
            _ => {}
        }
        Ok(())
    }

    fn grant(&mut self, sender: &str, role: MembershipType) {
        let change = match self.members.get_mut(sender) {
            Some(existing) if existing.membership_type == role => return,
            Some(existing) => {
                existing.membership_type = role;
                match role {
                    MembershipType::Admin => Change::Promoted(sender.to_string()),
                    MembershipType::Member => Change::Demoted(sender.to_string()),
                }
            }
            None => {
                self.members.insert(
                    sender.to_string(),
                    Membership {
                        identity_name: self.identity.name.clone(),
                        user_sender: sender.to_string(),
                        membership_type: role,
                        joined_at: self.now,
                    },
                );
                match role {
                    MembershipType::Admin => Change::AdminAdded(sender.to_string()),
                    MembershipType::Member => Change::MemberAdded(sender.to_string()),
                }
            }
        };
        self.changes.push(change);
    }

    fn apply_setting(&mut self, modifier: &Modifier) -> std::result::Result<(), Rejection> {
        match modifier {
            Modifier::SetDomain(domain) => {
                if self.identity.domain.as_deref() != Some(domain.as_str()) {
                    self.identity.domain = Some(domain.clone());
                    self.changes.push(Change::DomainSet(domain.clone()));
                }
            }
            Modifier::Enable => {
                if !self.identity.enabled {
                    self.identity.enabled = true;
                    self.changes.push(Change::Enabled);
                }
            }
            Modifier::Disable => {
                if self.identity.enabled {
                    self.identity.enabled = false;
                    self.changes.push(Change::Disabled);
                }
            }
            Modifier::Destroy => {
                if self.identity.enabled {
                    return Err(Rejection::DestroyWhileEnabled {
                        name: self.identity.name.clone(),
                    });
                }
                self.destroy = true;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(enabled: bool) -> IdentityRecord {
        IdentityRecord {
            name: "alice".to_string(),
            enabled,
            domain: None,
            created_at: 1,
            updated_at: 1,
            revision: 0,
        }
    }

    fn members(entries: &[(&str, MembershipType)]) -> BTreeMap<String, Membership> {
        entries
            .iter()
            .map(|(sender, role)| {
                (
                    sender.to_string(),
                    Membership {
                        identity_name: "alice".to_string(),
                        user_sender: sender.to_string(),
                        membership_type: *role,
                        joined_at: 1,
                    },
                )
            })
            .collect()
    }

    fn plan(enabled: bool, entries: &[(&str, MembershipType)]) -> Plan {
        Plan::new(identity(enabled), members(entries), 2)
    }

    #[test]
    fn test_grant_then_remove_last_admin_succeeds() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        let modifiers = vec![
            Modifier::GrantAdmin("s2".into()),
            Modifier::Remove("s1".into()),
        ];

        plan.apply_all(&modifiers).unwrap();

        assert_eq!(
            plan.changes,
            vec![Change::AdminAdded("s2".into()), Change::Removed("s1".into())]
        );
        assert!(plan.members["s2"].membership_type.is_admin());
        assert!(!plan.members.contains_key("s1"));
    }

    #[test]
    fn test_removing_only_admin_is_rejected() {
        let mut plan = plan(
            true,
            &[("s1", MembershipType::Admin), ("s2", MembershipType::Member)],
        );
        let err = plan.apply_all(&[Modifier::Remove("s1".into())]).unwrap_err();
        assert_eq!(err, Rejection::NoAdminLeft { name: "alice".into() });
    }

    #[test]
    fn test_demoting_only_admin_is_rejected() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        let err = plan
            .apply_all(&[Modifier::GrantMember("s1".into())])
            .unwrap_err();
        assert_eq!(err, Rejection::NoAdminLeft { name: "alice".into() });
    }

    #[test]
    fn test_admin_invariant_checked_before_destroy() {
        let mut plan = plan(false, &[("s1", MembershipType::Admin)]);
        let err = plan
            .apply_all(&[Modifier::Remove("s1".into()), Modifier::Destroy])
            .unwrap_err();
        assert_eq!(err, Rejection::NoAdminLeft { name: "alice".into() });
        assert!(!plan.destroy);
    }

    #[test]
    fn test_remove_unknown_sender_is_rejected() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        let err = plan.apply_all(&[Modifier::Remove("s9".into())]).unwrap_err();
        assert_eq!(
            err,
            Rejection::NotAMember {
                name: "alice".into(),
                sender: "s9".into()
            }
        );
    }

    #[test]
    fn test_promote_and_demote_toggle_membership_type() {
        let mut plan = plan(
            true,
            &[("s1", MembershipType::Admin), ("s2", MembershipType::Member)],
        );
        plan.apply_all(&[
            Modifier::GrantMember("s1".into()),
            Modifier::GrantAdmin("s2".into()),
        ])
        .unwrap();

        assert_eq!(plan.members["s1"].membership_type, MembershipType::Member);
        assert_eq!(plan.members["s2"].membership_type, MembershipType::Admin);
        assert_eq!(
            plan.changes,
            vec![Change::Demoted("s1".into()), Change::Promoted("s2".into())]
        );
    }

    #[test]
    fn test_regrant_same_role_is_noop() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        plan.apply_all(&[Modifier::GrantAdmin("s1".into()), Modifier::Enable])
            .unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_disable_then_destroy_in_one_command() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        plan.apply_all(&[Modifier::Disable, Modifier::Destroy]).unwrap();
        assert!(plan.destroy);
    }

    #[test]
    fn test_destroy_enabled_identity_is_rejected() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        let err = plan.apply_all(&[Modifier::Destroy]).unwrap_err();
        assert_eq!(err, Rejection::DestroyWhileEnabled { name: "alice".into() });
    }

    #[test]
    fn test_set_domain() {
        let mut plan = plan(true, &[("s1", MembershipType::Admin)]);
        plan.apply_all(&[Modifier::SetDomain("alice.example".into())])
            .unwrap();
        assert_eq!(plan.identity.domain.as_deref(), Some("alice.example"));
        assert_eq!(plan.changes, vec![Change::DomainSet("alice.example".into())]);
    }
}
