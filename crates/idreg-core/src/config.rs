//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Default number of resolve-and-apply attempts per command
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Identity registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How many times a command is re-resolved and re-applied after losing
    /// a write race before it is rejected as contended
    pub max_commit_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}
