//! Status command - show the current pin

use crate::pin::PinStore;
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};

/// Run the status command
pub fn run(store: &dyn PinStore, format: OutputFormat) -> Result<String> {
    let pin = store.load().context("Failed to read the pin")?;
    reporters::render_status(pin.as_ref(), format)
}
