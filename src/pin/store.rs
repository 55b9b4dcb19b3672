//! Pin persistence
//!
//! [`FilePinStore`] keeps the pin as a small JSON record and replaces it
//! atomically (temp file + rename), so readers see either the old pin or
//! the new one. Concurrent writers are last-writer-wins.

use super::Pin;
use crate::error::{PinlogError, PinlogResult};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load, replace and clear the single active pin.
pub trait PinStore {
    /// The active pin, or `None` if nothing has been pinned.
    fn load(&self) -> PinlogResult<Option<Pin>>;

    /// Replace the active pin.
    fn save(&self, pin: &Pin) -> PinlogResult<()>;

    /// Remove the active pin. Clearing when nothing is pinned succeeds.
    fn clear(&self) -> PinlogResult<()>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FilePinStore {
    path: PathBuf,
}

impl FilePinStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `repo_root` under `state_root`.
    pub fn for_repo(state_root: &Path, repo_root: &Path) -> Self {
        Self::new(super::pin_file_path(state_root, repo_root))
    }

    /// Location of the record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, tmp_path: &Path, pin: &Pin) -> io::Result<()> {
        let file = File::create(tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, pin)?;
        writer.write_all(b"\n")?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl PinStore for FilePinStore {
    fn load(&self) -> PinlogResult<Option<Pin>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PinlogError::storage(&self.path, e)),
        };

        let pin: Pin = serde_json::from_str(&data).map_err(|e| {
            PinlogError::storage(&self.path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        if pin.path.trim().is_empty() {
            return Err(PinlogError::storage(
                &self.path,
                io::Error::new(io::ErrorKind::InvalidData, "pin record has an empty path"),
            ));
        }

        debug!("Loaded pin {} from {}", pin, self.path.display());
        Ok(Some(pin))
    }

    fn save(&self, pin: &Pin) -> PinlogResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PinlogError::storage(parent, e))?;
        }

        // Write to temp file first, then rename (atomic on POSIX)
        let tmp_path = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));

        if let Err(e) = self.write_record(&tmp_path, pin) {
            let _ = fs::remove_file(&tmp_path);
            return Err(PinlogError::storage(&tmp_path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(PinlogError::storage(&self.path, e));
        }

        debug!("Saved pin {} to {}", pin, self.path.display());
        Ok(())
    }

    fn clear(&self) -> PinlogResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Cleared pin at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PinlogError::storage(&self.path, e)),
        }
    }
}

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryPinStore {
    pin: RefCell<Option<Pin>>,
}

impl MemoryPinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts out holding `pin`.
    pub fn with_pin(pin: Pin) -> Self {
        Self {
            pin: RefCell::new(Some(pin)),
        }
    }
}

impl PinStore for MemoryPinStore {
    fn load(&self) -> PinlogResult<Option<Pin>> {
        Ok(self.pin.borrow().clone())
    }

    fn save(&self, pin: &Pin) -> PinlogResult<()> {
        *self.pin.borrow_mut() = Some(pin.clone());
        Ok(())
    }

    fn clear(&self) -> PinlogResult<()> {
        *self.pin.borrow_mut() = None;
        Ok(())
    }
}
