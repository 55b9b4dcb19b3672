//! User-level configuration for pinlog
//!
//! Supports loading config from:
//! - Environment variables
//! - ~/.config/pinlog/config.toml (or the file named by `PINLOG_CONFIG`)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "PINLOG_CONFIG";
/// Overrides `[storage] state_dir`.
pub const STATE_DIR_ENV: &str = "PINLOG_STATE_DIR";
/// Overrides `[history] default_limit`.
pub const DEFAULT_LIMIT_ENV: &str = "PINLOG_DEFAULT_LIMIT";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Commits shown when `--limit` is not given (default: all)
    pub default_limit: Option<usize>,

    /// Output format: "text" (default) or "json"
    pub format: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Where pin records live (default: platform data dir)
    pub state_dir: Option<PathBuf>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/pinlog/config.toml)
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(Self::user_config_path);
        Ok(Self::load_with(path.as_deref(), |key| std::env::var(key).ok()))
    }

    /// Load from `path` (if it exists) and then apply overrides from `env`.
    ///
    /// A config file that can't be read or parsed is reported and skipped.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = UserConfig::default();

        if let Some(path) = path.filter(|p| p.exists()) {
            match std::fs::read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|content| toml::from_str::<UserConfig>(&content).map_err(Into::into))
            {
                Ok(user_config) => config.merge(user_config),
                Err(e) => warn!("Ignoring invalid config {}: {}", path.display(), e),
            }
        }

        // Environment variables override everything
        if let Some(dir) = env(STATE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.storage.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = env(DEFAULT_LIMIT_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.history.default_limit = Some(limit),
                _ => warn!("Ignoring {}={:?}: expected a positive integer", DEFAULT_LIMIT_ENV, raw),
            }
        }

        config
    }

    /// Get the user config directory path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pinlog").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.history.default_limit.is_some() {
            self.history.default_limit = other.history.default_limit;
        }
        if other.history.format.is_some() {
            self.history.format = other.history.format;
        }
        if other.storage.state_dir.is_some() {
            self.storage.state_dir = other.storage.state_dir;
        }
    }

    /// Positive default limit, if configured. Zero means unlimited.
    pub fn default_limit(&self) -> Option<usize> {
        self.history.default_limit.filter(|n| *n > 0)
    }

    /// Configured output format name
    pub fn format(&self) -> &str {
        self.history.format.as_deref().unwrap_or("text")
    }

    /// Root directory for pin records
    pub fn state_root(&self) -> PathBuf {
        self.storage
            .state_dir
            .clone()
            .unwrap_or_else(crate::pin::default_state_root)
    }

    /// Initialize user config directory and create example config
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(Self::user_config_path)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::write_example(&config_path)?;
        Ok(config_path)
    }

    /// Write the commented example config to `config_path` unless a file
    /// is already there.
    pub fn write_example(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !config_path.exists() {
            let example = r#"# pinlog user configuration

[history]
# Commits shown when --limit is not given (default: all)
# default_limit = 10

# Output format: "text" or "json"
# format = "text"

[storage]
# Where pin records are kept (default: platform data directory)
# state_dir = "/path/to/pinlog-state"
"#;
            std::fs::write(config_path, example)?;
        }
        Ok(())
    }
}
