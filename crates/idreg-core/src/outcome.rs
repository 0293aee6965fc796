//! Results of handling a command.

use crate::{
    errors::{ErrorKind, Rejection},
    grammar::{GrammarError, Modifier},
    types::MembershipType,
};

/// One applied change to an existing identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    MemberAdded(String),
    AdminAdded(String),
    Promoted(String),
    Demoted(String),
    Removed(String),
    DomainSet(String),
    Enabled,
    Disabled,
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::MemberAdded(sender) => write!(f, "added member {}", sender),
            Change::AdminAdded(sender) => write!(f, "added admin {}", sender),
            Change::Promoted(sender) => write!(f, "promoted {} to admin", sender),
            Change::Demoted(sender) => write!(f, "demoted {} to member", sender),
            Change::Removed(sender) => write!(f, "removed {}", sender),
            Change::DomainSet(domain) => write!(f, "domain set to {}", domain),
            Change::Enabled => write!(f, "enabled"),
            Change::Disabled => write!(f, "disabled"),
        }
    }
}

/// Outcome of a command the registry understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new identity was created with the caller as its only admin
    Claimed {
        name: String,
        /// Modifiers sent along with the claim; they have no effect on creation
        ignored: Vec<Modifier>,
    },
    /// Bare claim of an identity that is already the caller's primary
    AlreadyYours { name: String, role: MembershipType },
    /// Bare claim made a held identity the caller's primary
    Switched { name: String, role: MembershipType },
    /// Admin changes were applied; empty when every modifier was a no-op
    Updated { name: String, changes: Vec<Change> },
    /// The identity and all its memberships were deleted
    Destroyed { name: String },
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    pub fn rejection_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Rejected(rejection) => Some(rejection.kind()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Claimed { name, .. } => write!(f, "{} is now yours", name),
            Outcome::AlreadyYours { name, role } => {
                write!(f, "{} is already yours ({})", name, role)
            }
            Outcome::Switched { name, role } => {
                write!(f, "{} is now your primary identity ({})", name, role)
            }
            Outcome::Updated { name, changes } if changes.is_empty() => {
                write!(f, "{}: nothing to change", name)
            }
            Outcome::Updated { name, changes } => {
                let changes: Vec<String> = changes.iter().map(ToString::to_string).collect();
                write!(f, "{}: {}", name, changes.join(", "))
            }
            Outcome::Destroyed { name } => write!(f, "{} has been destroyed", name),
            Outcome::Rejected(rejection) => write!(f, "{}", rejection),
        }
    }
}

/// Why a command was not routed to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unhandled {
    /// Command does not start with `id `
    NotAnIdCommand,
    Malformed(GrammarError),
    InvalidName(String),
}

impl Unhandled {
    /// Classification for commands that looked like `id` commands
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Unhandled::NotAnIdCommand => None,
            Unhandled::Malformed(_) => Some(ErrorKind::MalformedCommand),
            Unhandled::InvalidName(_) => Some(ErrorKind::InvalidName),
        }
    }
}

/// Result of dispatching one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Outcome(Outcome),
    /// The caller should answer with its generic "did not understand" reply
    Unhandled(Unhandled),
}

impl Response {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Response::Outcome(outcome) => Some(outcome),
            Response::Unhandled(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_display_lists_changes() {
        let outcome = Outcome::Updated {
            name: "alice".to_string(),
            changes: vec![
                Change::AdminAdded("s2".to_string()),
                Change::DomainSet("alice.io".to_string()),
            ],
        };
        assert_eq!(
            outcome.to_string(),
            "alice: added admin s2, domain set to alice.io"
        );
    }

    #[test]
    fn test_rejection_kind_passthrough() {
        let outcome = Outcome::Rejected(Rejection::Taken {
            name: "alice".to_string(),
        });
        assert!(outcome.is_rejected());
        assert_eq!(outcome.rejection_kind(), Some(ErrorKind::Conflict));
        assert_eq!(outcome.to_string(), "alice is already taken");
    }

    #[test]
    fn test_unhandled_kinds() {
        assert_eq!(Unhandled::NotAnIdCommand.kind(), None);
        assert_eq!(
            Unhandled::Malformed(GrammarError::Empty).kind(),
            Some(ErrorKind::MalformedCommand)
        );
        assert_eq!(
            Unhandled::InvalidName("Bob".to_string()).kind(),
            Some(ErrorKind::InvalidName)
        );
    }
}
