//! The pinned history target
//!
//! A [`Pin`] names one repository-relative file and, optionally, one line of
//! it. History queries fall back to the pin when no explicit file is given.
//! Pins are persisted through a [`PinStore`]; see [`store`].

pub mod paths;
pub mod store;

pub use paths::{default_state_root, pin_file_path, repo_state_dir};
pub use store::{FilePinStore, MemoryPinStore, PinStore};

use crate::error::{PinlogError, PinlogResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Pinned file and optional line (1-indexed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Repository-relative path, `/`-separated
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<NonZeroU32>,
}

impl Pin {
    /// Build a pin, normalising the path and rejecting empty paths and line 0.
    pub fn new(path: &str, line: Option<u32>) -> PinlogResult<Self> {
        let path = normalize_repo_path(path)?;
        let line = line
            .map(|n| {
                NonZeroU32::new(n).ok_or_else(|| {
                    PinlogError::InvalidArgument("line numbers start at 1".to_string())
                })
            })
            .transpose()?;
        Ok(Self { path, line })
    }

    /// Parse `path` or `path#line`.
    ///
    /// A `#` suffix that is not a number pins line 1, so `file.rs#` and
    /// `file.rs#top` both mean the first line.
    pub fn parse(spec: &str) -> PinlogResult<Self> {
        match spec.split_once('#') {
            Some((path, line)) => {
                let line = if !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()) {
                    line.parse::<u32>().map_err(|_| {
                        PinlogError::InvalidArgument(format!("line number '{}' is too large", line))
                    })?
                } else {
                    1
                };
                Self::new(path, Some(line))
            }
            None => Self::new(spec, None),
        }
    }

    /// Pinned line as a plain integer.
    pub fn line_number(&self) -> Option<u32> {
        self.line.map(NonZeroU32::get)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}#{}", self.path, line),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Normalise a repository-relative path: forward slashes, no leading `./`.
pub fn normalize_repo_path(path: &str) -> PinlogResult<String> {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    let normalized = normalized.trim_start_matches('/').to_string();
    if normalized.is_empty() {
        return Err(PinlogError::InvalidArgument(
            "file path must not be empty".to_string(),
        ));
    }
    Ok(normalized)
}
