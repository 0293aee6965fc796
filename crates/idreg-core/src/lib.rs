//! # idreg-core
//!
//! Identity registry core: resolves `id ...` commands sent by network
//! participants into mutations of a shared identity registry.
//!
//! This crate is responsible for:
//! - Parsing `id` commands into typed intents
//! - Validating identity names
//! - Classifying a sender's standing on an identity
//! - Applying claims, role changes, domain updates and the
//!   enable/disable/destroy lifecycle under the admin invariant

#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod grammar;
pub mod outcome;
mod service;
pub mod traits;
pub mod types;
pub mod validation;

pub use config::RegistryConfig;
pub use errors::{ErrorKind, RegistryError, Rejection, Result};
pub use grammar::{parse_command, GrammarError, IdCommand, Modifier};
pub use outcome::{Change, Outcome, Response, Unhandled};
pub use service::IdentityRegistryService;
pub use traits::IdentityRegistry;
pub use types::*;
pub use validation::is_valid_name;
