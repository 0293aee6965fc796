use anyhow::{Context, Result};
use idreg_core::RegistryConfig;
use std::path::PathBuf;

/// Console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to RocksDB database
    pub database_path: PathBuf,

    /// Registry tuning
    pub registry: RegistryConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = lookup("IDREG_DATABASE_PATH")
            .unwrap_or_else(|| "./data/idreg.db".to_string())
            .into();

        let mut registry = RegistryConfig::default();
        if let Some(attempts) = lookup("IDREG_MAX_COMMIT_ATTEMPTS") {
            registry.max_commit_attempts = attempts
                .parse()
                .context("IDREG_MAX_COMMIT_ATTEMPTS must be a positive integer")?;
            if registry.max_commit_attempts == 0 {
                anyhow::bail!("IDREG_MAX_COMMIT_ATTEMPTS must be at least 1");
            }
        }

        Ok(Config {
            database_path,
            registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./data/idreg.db"));
        assert_eq!(config.registry.max_commit_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("IDREG_DATABASE_PATH", "/tmp/registry"),
            ("IDREG_MAX_COMMIT_ATTEMPTS", "5"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/registry"));
        assert_eq!(config.registry.max_commit_attempts, 5);
    }

    #[test]
    fn test_rejects_bad_attempts() {
        assert!(load(&[("IDREG_MAX_COMMIT_ATTEMPTS", "zero")]).is_err());
        assert!(load(&[("IDREG_MAX_COMMIT_ATTEMPTS", "0")]).is_err());
    }
}
