//! Output reporters for pinlog query results
//!
//! Supports multiple output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::history::{FilterSpec, QueryOutcome, RelatedFiles};
use crate::pin::Pin;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A history result together with the query that produced it.
#[derive(Debug, Serialize)]
pub struct HistoryReport<'a> {
    pub query: &'a FilterSpec,
    #[serde(flatten)]
    pub outcome: &'a QueryOutcome,
}

/// Render a history result in the specified format
pub fn render_history(spec: &FilterSpec, outcome: &QueryOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_history(spec, outcome),
        OutputFormat::Json => json::render(&HistoryReport {
            query: spec,
            outcome,
        }),
    }
}

/// Render co-changed files in the specified format
pub fn render_related(related: &RelatedFiles, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_related(related),
        OutputFormat::Json => json::render(related),
    }
}

/// Render the current pin (or its absence) in the specified format
pub fn render_status(pin: Option<&Pin>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_status(pin)),
        OutputFormat::Json => json::render(&serde_json::json!({ "pin": pin })),
    }
}
