//! Application configuration management.
//!
//! Configuration is stored at `~/.config/sessionkit/config.json` and selects
//! the storage backend, session lifetime and log directory. Environment
//! variables override the file:
//!
//! - `SESSIONKIT_STORAGE`: `keyring`, `file`, `encrypted-file` or `memory`
//! - `SESSIONKIT_EXPIRY_MINUTES`: session lifetime
//! - `SESSIONKIT_PASSPHRASE`: passphrase for the `encrypted-file` backend

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::TOKEN_EXPIRY_MINUTES;
use crate::storage::keyring::DEFAULT_SERVICE_NAME;
use crate::storage::{
    EncryptedFileStorage, FileStorage, KeyringStorage, MemoryStorage, SessionStorage,
    StorageBackend,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionkit";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Longest accepted session lifetime (one year)
pub const MAX_TOKEN_EXPIRY_MINUTES: i64 = 60 * 24 * 365;

const ENV_STORAGE: &str = "SESSIONKIT_STORAGE";
const ENV_EXPIRY_MINUTES: &str = "SESSIONKIT_EXPIRY_MINUTES";
const ENV_PASSPHRASE: &str = "SESSIONKIT_PASSPHRASE";

fn default_expiry_minutes() -> i64 {
    TOKEN_EXPIRY_MINUTES
}

fn valid_expiry(minutes: i64) -> bool {
    (1..=MAX_TOKEN_EXPIRY_MINUTES).contains(&minutes)
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default = "default_expiry_minutes")]
    pub token_expiry_minutes: i64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Directory for rolling log files. Logs go to stderr only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Only read from the environment, never written to disk.
    #[serde(skip)]
    pub passphrase: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            token_expiry_minutes: default_expiry_minutes(),
            service_name: default_service_name(),
            log_dir: None,
            passphrase: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };
        if !valid_expiry(config.token_expiry_minutes) {
            warn!(
                value = config.token_expiry_minutes,
                "token_expiry_minutes out of range, using default"
            );
            config.token_expiry_minutes = default_expiry_minutes();
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from `lookup`, normally the process environment.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_STORAGE) {
            match value.parse() {
                Ok(backend) => self.storage = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_STORAGE),
            }
        }
        if let Some(value) = lookup(ENV_EXPIRY_MINUTES) {
            match value.trim().parse::<i64>() {
                Ok(minutes) if valid_expiry(minutes) => self.token_expiry_minutes = minutes,
                _ => warn!(value = %value, "Ignoring {}", ENV_EXPIRY_MINUTES),
            }
        }
        if let Some(value) = lookup(ENV_PASSPHRASE) {
            self.passphrase = Some(value);
        }
    }

    /// Configured lifetime, clamped to `1..=MAX_TOKEN_EXPIRY_MINUTES`.
    pub fn token_lifetime(&self) -> Duration {
        let minutes = self
            .token_expiry_minutes
            .clamp(1, MAX_TOKEN_EXPIRY_MINUTES);
        Duration::try_minutes(minutes).unwrap_or_else(|| Duration::minutes(TOKEN_EXPIRY_MINUTES))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Build the configured storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn SessionStorage>> {
        debug!(backend = %self.storage, "Opening session storage");
        let storage: Arc<dyn SessionStorage> = match self.storage {
            StorageBackend::Keyring => Arc::new(KeyringStorage::new(self.service_name.clone())),
            StorageBackend::File => Arc::new(FileStorage::in_dir(&self.cache_dir()?)),
            StorageBackend::EncryptedFile => {
                let passphrase = self.passphrase.clone().with_context(|| {
                    format!("{} must be set for the encrypted-file backend", ENV_PASSPHRASE)
                })?;
                Arc::new(EncryptedFileStorage::in_dir(&self.cache_dir()?, passphrase))
            }
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        };
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.token_lifetime(), Duration::minutes(5));
        assert_eq!(config.service_name, "sessionkit");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"storage":"file"}"#).unwrap();
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.token_expiry_minutes, 5);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (ENV_STORAGE, "memory"),
            (ENV_EXPIRY_MINUTES, "10"),
            (ENV_PASSPHRASE, "pw"),
        ]));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.token_lifetime(), Duration::minutes(10));
        assert_eq!(config.passphrase.as_deref(), Some("pw"));
    }

    #[test]
    fn test_bad_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_STORAGE, "floppy"), (ENV_EXPIRY_MINUTES, "-3")]));
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.token_expiry_minutes, 5);
    }

    #[test]
    fn test_oversized_expiry_rejected() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_EXPIRY_MINUTES, "9223372036854775807")]));
        assert_eq!(config.token_expiry_minutes, 5);
        assert_eq!(config.token_lifetime(), Duration::minutes(5));
    }

    #[test]
    fn test_oversized_expiry_in_file_is_clamped() {
        let config: Config =
            serde_json::from_str(r#"{"token_expiry_minutes":9223372036854775807}"#).unwrap();
        assert_eq!(
            config.token_lifetime(),
            Duration::minutes(MAX_TOKEN_EXPIRY_MINUTES)
        );

        let config: Config = serde_json::from_str(r#"{"token_expiry_minutes":0}"#).unwrap();
        assert_eq!(config.token_lifetime(), Duration::minutes(1));
    }

    #[test]
    fn test_passphrase_never_serialized() {
        let config = Config {
            passphrase: Some("secret".to_string()),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_encrypted_backend_needs_passphrase() {
        let config = Config {
            storage: StorageBackend::EncryptedFile,
            ..Config::default()
        };
        assert!(config.open_storage().is_err());
    }

    #[test]
    fn test_open_memory_storage() {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        assert_eq!(config.open_storage().unwrap().name(), "memory");
    }
}
