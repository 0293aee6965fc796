//! Command dispatch: grammar, name check, resolve, apply.

use crate::{errors::*, grammar::parse_command, outcome::*, validation::is_valid_name};
use idreg_storage::Storage;
use tracing::{debug, warn};

use super::IdentityRegistryService;

/// Prefix, matched against the lower-cased command, that routes to the registry
const ID_PREFIX: &str = "id ";

impl<S> IdentityRegistryService<S>
where
    S: Storage + 'static,
{
    /// Route one command from `sender` through the registry
    ///
    /// Commands on the same identity name are handled one at a time.
    /// Resolve and apply are retried when the commit still loses a race on a
    /// shared user row, which only another identity's command can cause.
    pub(crate) async fn handle_internal(&self, command: &str, sender: &str) -> Result<Response> {
        let command = command.trim_start();
        if !command.to_lowercase().starts_with(ID_PREFIX) {
            return Ok(Response::Unhandled(Unhandled::NotAnIdCommand));
        }

        let parsed = match parse_command(command) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Could not parse id command");
                return Ok(Response::Unhandled(Unhandled::Malformed(e)));
            }
        };

        if !is_valid_name(&parsed.name) {
            debug!(name = %parsed.name, "Invalid identity name");
            return Ok(Response::Unhandled(Unhandled::InvalidName(parsed.name)));
        }

        let _name_guard = self.name_locks.acquire(&parsed.name).await;

        let attempts = self.config.max_commit_attempts.max(1);
        for attempt in 1..=attempts {
            let resolution = self.resolve_internal(&parsed.name, sender).await?;

            match self.apply_internal(&resolution, &parsed, sender).await {
                Ok(outcome) => return Ok(Response::Outcome(outcome)),
                Err(e) if e.is_conflict() => {
                    debug!(identity = %parsed.name, attempt, "Commit lost a race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(identity = %parsed.name, attempts, "Giving up on contended identity");
        Ok(Response::Outcome(Outcome::Rejected(Rejection::Contended {
            name: parsed.name,
        })))
    }
}
