//! Configuration module for pinlog
//!
//! This module handles:
//! - User-level defaults (config.toml)
//! - Environment overrides
//! - Pin state location

mod user_config;

pub use user_config::{
    HistoryConfig, StorageConfig, UserConfig, CONFIG_PATH_ENV, DEFAULT_LIMIT_ENV, STATE_DIR_ENV,
};
