//! RocksDB column family definitions.

/// Identity records: identity_name → IdentityRecord
pub const CF_IDENTITIES: &str = "identities";

/// Memberships: (identity_name, sender) → Membership
pub const CF_MEMBERSHIPS: &str = "memberships";

/// Memberships by sender index: (sender, identity_name) → ()
pub const CF_MEMBERSHIPS_BY_SENDER: &str = "memberships_by_sender";

/// Users: sender → User
pub const CF_USERS: &str = "users";

/// Get all column family names
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        CF_IDENTITIES,
        CF_MEMBERSHIPS,
        CF_MEMBERSHIPS_BY_SENDER,
        CF_USERS,
    ]
}
