//! Pin command - set or clear the pinned file

use super::Workspace;
use crate::error::PinlogError;
use crate::git::VcsGateway;
use crate::pin::{Pin, PinStore};
use anyhow::{Context, Result};
use console::style;
use tracing::warn;

/// Run the pin command
pub fn run(
    workspace: &Workspace,
    store: &dyn PinStore,
    target: Option<&str>,
    line: Option<u32>,
    clear: bool,
) -> Result<String> {
    if clear {
        store.clear().context("Failed to clear the pin")?;
        return Ok("Pin cleared".to_string());
    }

    let target = target.context("Nothing to pin: pass a file path or --clear")?;
    // Resolve the path part first so absolute paths survive normalisation.
    let (raw_path, suffix) = match target.split_once('#') {
        Some((path, suffix)) => (path, Some(suffix)),
        None => (target, None),
    };
    if raw_path.trim().is_empty() {
        return Err(PinlogError::InvalidArgument("file path must not be empty".to_string()).into());
    }
    let path = workspace.relative(raw_path)?;
    let parsed = match suffix {
        Some(suffix) => Pin::parse(&format!("{}#{}", path, suffix))?,
        None => Pin::new(&path, None)?,
    };
    let pin = Pin::new(&parsed.path, line.or(parsed.line_number()))?;

    if workspace.repo.head_has_path(&pin.path)? == Some(false) {
        warn!("{} is not tracked at HEAD; history queries will be empty", pin.path);
    }

    store.save(&pin).context("Failed to save the pin")?;
    Ok(format!("Pinned {}", style(&pin).cyan()))
}
