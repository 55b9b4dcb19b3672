//! Pin state location - ~/.local/share/pinlog/<repo-name>-<hash>/pin.json
//!
//! The record lives outside the repository so pinning never dirties the
//! working tree.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File name of the persisted pin record.
pub const PIN_FILE_NAME: &str = "pin.json";

/// Default root for per-repository state.
/// Uses the platform data directory (%LOCALAPPDATA% on Windows).
pub fn default_state_root() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        // Fallback to ~/.local/share
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("pinlog")
}

/// State directory of one repository under `state_root`.
pub fn repo_state_dir(state_root: &Path, repo_path: &Path) -> PathBuf {
    state_root.join(hash_path(repo_path))
}

/// Pin record path of one repository under `state_root`.
pub fn pin_file_path(state_root: &Path, repo_path: &Path) -> PathBuf {
    repo_state_dir(state_root, repo_path).join(PIN_FILE_NAME)
}

/// Hash a path to create a unique but deterministic directory name.
/// Uses the canonical path so `.` and an absolute path agree, and SHA-256
/// so the name is stable across builds.
fn hash_path(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let path_str = canonical.to_string_lossy();

    let digest = Sha256::digest(path_str.as_bytes());
    let hash: String = format!("{:x}", digest).chars().take(12).collect();

    let repo_name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repo")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(20)
        .collect::<String>();

    format!("{}-{}", repo_name, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_path_deterministic() {
        let path = Path::new("/tmp/test-repo");
        assert_eq!(hash_path(path), hash_path(path));
    }

    #[test]
    fn test_hash_path_distinguishes_repos() {
        assert_ne!(
            hash_path(Path::new("/work/a/project")),
            hash_path(Path::new("/work/b/project"))
        );
    }

    #[test]
    fn test_pin_file_layout() {
        let root = Path::new("/state");
        let pin = pin_file_path(root, Path::new("/home/user/my-project"));
        assert!(pin.starts_with("/state"));
        assert!(pin.to_string_lossy().contains("my-project-"));
        assert!(pin.ends_with(PIN_FILE_NAME));
    }

    #[test]
    fn test_default_root_is_namespaced() {
        assert!(default_state_root().ends_with("pinlog"));
    }
}
