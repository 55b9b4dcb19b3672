//! History command - query the pinned file's commit log

use super::{HistoryArgs, Workspace};
use crate::history::{self, FilterSpec, HistoryRequest};
use crate::pin::PinStore;
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use tracing::info;

/// Run the history command
pub fn run(
    workspace: &Workspace,
    store: &dyn PinStore,
    args: &HistoryArgs,
    default_limit: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let file = args
        .file
        .as_deref()
        .map(|f| workspace.relative(f))
        .transpose()?;

    let request = HistoryRequest {
        file,
        line: args.line,
        author: args.author.clone(),
        after: args.after.clone(),
        before: args.before.clone(),
        limit: args.limit.or(default_limit),
        reverse: args.reverse,
        ignore_line: args.ignore_line,
        summary: args.summary,
        traverse: args.traverse,
        files_changed: args.files_changed,
    };

    let pin = store.load().context("Failed to read the pin")?;
    let spec = FilterSpec::resolve(&request, pin.as_ref())?;
    info!(
        "Querying {} history of {}{}",
        spec.mode,
        spec.target_path,
        spec.target_line.map(|l| format!(" line {}", l)).unwrap_or_default()
    );

    let outcome = history::run(&workspace.repo, &spec)?;
    reporters::render_history(&spec, &outcome, format)
}
