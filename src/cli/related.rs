//! Related command - files changed together with the pinned file

use crate::git::VcsGateway;
use crate::history;
use crate::pin::PinStore;
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};

/// Run the related command
pub fn run<G: VcsGateway + ?Sized>(
    gateway: &G,
    store: &dyn PinStore,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let pin = store.load().context("Failed to read the pin")?;
    let related = history::related(gateway, pin.as_ref(), limit)?;
    reporters::render_related(&related, format)
}
