//! Identity registry type definitions.

use serde::{Deserialize, Serialize};

/// Role a sender holds on an identity
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipType {
    Admin = 0x01,
    Member = 0x02,
}

impl MembershipType {
    pub fn is_admin(self) -> bool {
        self == MembershipType::Admin
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MembershipType::Admin => "admin",
            MembershipType::Member => "member",
        };
        write!(f, "{}", s)
    }
}

/// Identity record, keyed by its unique name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub name: String,
    pub enabled: bool,
    pub domain: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    /// Bumped on every mutation of the identity or its memberships
    pub revision: u64,
}

/// User record, keyed by sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub sender: String,
    pub primary_identity_name: Option<String>,
    pub created_at: u64,
}

/// Sender membership on an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub identity_name: String,
    pub user_sender: String,
    pub membership_type: MembershipType,
    pub joined_at: u64,
}

/// Caller's standing on an identity it holds a membership for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub role: MembershipType,
    pub enabled: bool,
    pub identity_name: String,
    pub membership_type: MembershipType,
    pub primary_identity_name: Option<String>,
}

/// Caller's relationship to an identity name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStatus {
    /// No identity with this name exists
    Available,
    /// The identity exists and the caller has no membership on it
    Taken,
    /// The identity exists and the caller holds a membership on it
    Existing(Standing),
}

impl IdentityStatus {
    /// Caller's role, if it has one
    pub fn role(&self) -> Option<MembershipType> {
        match self {
            IdentityStatus::Existing(standing) => Some(standing.role),
            _ => None,
        }
    }
}

/// Result of resolving a caller against an identity name
///
/// Carries the rows the status was derived from so a mutation can be
/// guarded against them at commit time.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: IdentityStatus,
    pub identity: Option<IdentityRecord>,
    pub caller: Option<User>,
}

/// Seconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
