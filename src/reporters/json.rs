//! JSON reporter
//!
//! Pretty-printed JSON for piping to jq or further processing.

use anyhow::Result;
use serde::Serialize;

/// Render any result as JSON
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
