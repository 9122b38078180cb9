//! Configuration loading for LevelUp.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.levelup/config.toml`)
//! 3. User config (`~/.levelup/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with file storage under
//! the LevelUp home directory when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, LevelUpError, Result};
use crate::storage::DEFAULT_KEY_PREFIX;

/// Main configuration struct for LevelUp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Progress storage configuration.
    pub storage: StorageConfig,
    /// Reward behavior configuration.
    pub rewards: RewardConfig,
}

/// Valid values for the storage backend field.
pub const VALID_BACKENDS: &[&str] = &["file", "memory"];

/// Progress storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Which store to use: "file" or "memory".
    pub backend: String,
    /// Progress file for the file backend. Defaults to `<home>/progress.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Prefix for every persisted key.
    pub key_prefix: String,
}

impl StorageConfig {
    /// Check if a backend value is valid.
    pub fn is_valid_backend(value: &str) -> bool {
        VALID_BACKENDS.contains(&value)
    }

    /// Resolve the progress file path for the file backend.
    pub fn progress_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(default_progress_path)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            path: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

/// Reward behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardConfig {
    /// Seed for random reward selection. Unset means seeded from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `<home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = levelup_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.levelup/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_config_path(cwd))
    }

    /// Load a config layer that may legitimately be absent.
    ///
    /// A missing file is silent; an unreadable or invalid one is logged.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_default(&format!("loading {}", path.display()))
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| LevelUpError::storage(path, e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| LevelUpError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !StorageConfig::is_valid_backend(&self.storage.backend) {
            return Err(LevelUpError::config(format!(
                "invalid storage backend '{}', expected one of {:?}",
                self.storage.backend, VALID_BACKENDS
            )));
        }
        if self.storage.key_prefix.is_empty() {
            return Err(LevelUpError::config("storage key_prefix must not be empty"));
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // LEVELUP_STORAGE_BACKEND
        if let Ok(val) = env::var("LEVELUP_STORAGE_BACKEND") {
            if StorageConfig::is_valid_backend(&val) {
                self.storage.backend = val;
            } else {
                tracing::warn!(
                    "Invalid LEVELUP_STORAGE_BACKEND value '{}'. Valid values: {:?}. Using '{}'.",
                    val,
                    VALID_BACKENDS,
                    self.storage.backend
                );
            }
        }

        // LEVELUP_STORAGE_PATH
        if let Ok(val) = env::var("LEVELUP_STORAGE_PATH") {
            if val.is_empty() {
                tracing::warn!("LEVELUP_STORAGE_PATH is empty, ignoring");
            } else {
                self.storage.path = Some(PathBuf::from(val));
            }
        }

        // LEVELUP_KEY_PREFIX
        if let Ok(val) = env::var("LEVELUP_KEY_PREFIX") {
            if val.is_empty() {
                tracing::warn!("LEVELUP_KEY_PREFIX is empty, ignoring");
            } else {
                self.storage.key_prefix = val;
            }
        }

        // LEVELUP_REWARD_SEED
        if let Ok(val) = env::var("LEVELUP_REWARD_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.rewards.seed = Some(seed),
                Err(_) => tracing::warn!(
                    "Invalid LEVELUP_REWARD_SEED value '{}'. Expected an unsigned integer.",
                    val
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence, field by field. A layer cannot
    /// reset a value back to its default once a lower layer changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_storage = StorageConfig::default();
        if other.storage.backend != default_storage.backend {
            self.storage.backend = other.storage.backend;
        }
        if other.storage.path.is_some() {
            self.storage.path = other.storage.path;
        }
        if other.storage.key_prefix != default_storage.key_prefix {
            self.storage.key_prefix = other.storage.key_prefix;
        }

        if other.rewards.seed.is_some() {
            self.rewards.seed = other.rewards.seed;
        }

        self
    }
}

/// Get the LevelUp home directory.
///
/// `$LEVELUP_HOME` when set and non-empty, otherwise `~/.levelup`.
pub fn levelup_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("LEVELUP_HOME") {
        if home.is_empty() {
            tracing::warn!("LEVELUP_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("LEVELUP_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".levelup"))
}

/// Default progress file: `<levelup_home>/progress.json`.
pub fn default_progress_path() -> Option<PathBuf> {
    levelup_home().map(|h| h.join("progress.json"))
}

/// Project config file: `<cwd>/.levelup/config.toml`.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(".levelup").join("config.toml")
}
