//! Identity registry error types.
//!
//! [`RegistryError`] is for conditions the core cannot handle itself
//! (storage failures). Everything a sender can cause is a [`Rejection`] and
//! is reported back to them as an outcome.

use crate::types::MembershipType;
use thiserror::Error;

/// Classification of everything that can stop a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Grammar could not parse the command
    MalformedCommand,
    /// Identity token fails the name pattern
    InvalidName,
    /// Caller lacks the standing the command needs
    NotAuthorized,
    /// Identity name is held by someone else, or lost a concurrent race
    Conflict,
    /// Command would break a registry invariant
    InvariantViolation,
}

/// User-visible reason a command was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{name} is already taken")]
    Taken { name: String },

    #[error("only an admin of {name} can do that (you are a {role})")]
    NotAuthorized { name: String, role: MembershipType },

    #[error("{name} must keep at least one admin")]
    NoAdminLeft { name: String },

    #[error("{name} must be disabled before it can be destroyed")]
    DestroyWhileEnabled { name: String },

    #[error("{sender} is not a member of {name}")]
    NotAMember { name: String, sender: String },

    #[error("{name} is being changed by someone else, try again")]
    Contended { name: String },
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::Taken { .. } | Rejection::Contended { .. } => ErrorKind::Conflict,
            Rejection::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            Rejection::NoAdminLeft { .. }
            | Rejection::DestroyWhileEnabled { .. }
            | Rejection::NotAMember { .. } => ErrorKind::InvariantViolation,
        }
    }
}

/// Identity registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identity row missing where a membership says it should exist
    #[error("Identity not found: {0}")]
    NotFound(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] idreg_storage::StorageError),
}

impl RegistryError {
    /// Whether the error is a lost write race that can be retried
    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistryError::Storage(e) if e.is_conflict())
    }
}

/// Result type for identity registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
