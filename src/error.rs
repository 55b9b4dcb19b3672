//! Error types shared by the history engine and the pin store

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the user by pin and history operations
#[derive(Error, Debug)]
pub enum PinlogError {
    #[error("No file is currently pinned. Run 'pinlog pin <FILE>' or pass --file")]
    NoPin,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid date range: --after {after} is later than --before {before}")]
    InvalidRange { after: String, before: String },

    #[error("Conflicting options: {} cannot be combined", .0.join(", "))]
    ConflictingOptions(Vec<&'static str>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Pin storage failed at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

impl PinlogError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PinlogError::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type PinlogResult<T> = Result<T, PinlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_options_lists_flags() {
        let err = PinlogError::ConflictingOptions(vec!["--summary", "--traverse"]);
        assert_eq!(
            err.to_string(),
            "Conflicting options: --summary, --traverse cannot be combined"
        );
    }

    #[test]
    fn test_storage_error_mentions_path() {
        let err = PinlogError::storage(
            "/tmp/state/pin.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/state/pin.json"));
        assert!(msg.contains("denied"));
    }
}
