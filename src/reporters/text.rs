//! Text (terminal) reporter with colors and formatting

use crate::history::{
    FilterSpec, QueryOutcome, QueryResult, RelatedFiles, SummaryLine, TraversalEntry,
};
use crate::pin::Pin;
use anyhow::Result;
use console::style;
use indexmap::IndexMap;
use std::fmt::Write;

const DATE: &str = "%Y-%m-%d";

/// Render a history result as terminal output
pub fn render_history(spec: &FilterSpec, outcome: &QueryOutcome) -> Result<String> {
    let result = &outcome.result;
    let mut out = String::new();

    if let Some(range) = date_range(spec) {
        writeln!(out, "Showing commits {}", range)?;
    }

    if result.is_empty() {
        match &spec.author {
            Some(author) => writeln!(out, "No commits found for author: {}", author)?,
            None => writeln!(out, "No commits found matching the specified criteria.")?,
        }
        return Ok(out);
    }

    match result {
        QueryResult::Summary(lines) => {
            render_summary(&mut out, spec, lines)?;
            if outcome.is_truncated() {
                writeln!(
                    out,
                    "\nShowing {} of {} commits. Use --limit option to see more.",
                    outcome.shown, outcome.total
                )?;
            }
        }
        QueryResult::Traversal(entries) => render_traversal(&mut out, entries)?,
        QueryResult::FilesChanged(files) => render_files_changed(&mut out, spec, files)?,
    }

    if let Some(line) = spec.ignored_line {
        writeln!(
            out,
            "\n{} {} is pinned to line {}; showing full file history.",
            style("Note:").dim(),
            spec.target_path,
            line
        )?;
    }

    Ok(out)
}

fn date_range(spec: &FilterSpec) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(after) = spec.after {
        parts.push(format!("after {}", after.format(DATE)));
    }
    if let Some(before) = spec.before {
        parts.push(format!("before {}", before.format(DATE)));
    }
    (!parts.is_empty()).then(|| parts.join(" and "))
}

fn title(spec: &FilterSpec) -> String {
    match spec.target_line {
        Some(line) => format!("{} (line {})", spec.target_path, line),
        None => spec.target_path.clone(),
    }
}

fn render_summary(out: &mut String, spec: &FilterSpec, lines: &[SummaryLine]) -> Result<()> {
    writeln!(out, "{}\n", style(format!("Commit history for {}:", title(spec))).bold())?;

    for line in lines {
        writeln!(
            out,
            "{} {} {} {}",
            style(&line.short_id).yellow(),
            line.timestamp.format(DATE),
            style(&line.author).green(),
            line.headline
        )?;
    }

    if let Some(line) = spec.target_line {
        // The first line shown is the newest change, or the oldest when reversed.
        let verb = if spec.reverse {
            "first introduced"
        } else {
            "last modified"
        };
        if let Some(commit) = lines.first() {
            writeln!(
                out,
                "\nLine {} was {} in commit {}",
                line,
                verb,
                style(&commit.short_id).yellow()
            )?;
        }
    }
    Ok(())
}

fn render_traversal(out: &mut String, entries: &[TraversalEntry]) -> Result<()> {
    let total = entries.len();
    for (index, entry) in entries.iter().enumerate() {
        let record = &entry.record;
        writeln!(
            out,
            "{} {}",
            style(format!("Commit: {}", record.id)).bold().blue(),
            style(format!("({}/{})", index + 1, total)).dim()
        )?;
        writeln!(
            out,
            "{}",
            style(format!("Author: {} <{}>", record.author, record.author_email)).green()
        )?;
        writeln!(out, "Date:   {}", record.timestamp.format("%Y-%m-%d %H:%M:%S %Z"))?;
        if let Some(line) = record.resolved_line {
            writeln!(out, "Line:   {} in {}", line, record.path)?;
        }
        writeln!(out)?;
        for message_line in record.message.trim_end().lines() {
            writeln!(out, "    {}", style(message_line).yellow())?;
        }
        writeln!(out)?;

        if entry.diff.is_empty() {
            writeln!(out, "{}", style("No diff available").dim())?;
        }
        for diff_line in entry.diff.lines() {
            let styled = if diff_line.starts_with("@@") {
                style(diff_line).cyan()
            } else if diff_line.starts_with('+') && !diff_line.starts_with("+++") {
                style(diff_line).green()
            } else if diff_line.starts_with('-') && !diff_line.starts_with("---") {
                style(diff_line).red()
            } else {
                style(diff_line)
            };
            writeln!(out, "{}", styled)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn render_files_changed(
    out: &mut String,
    spec: &FilterSpec,
    files: &IndexMap<String, usize>,
) -> Result<()> {
    writeln!(
        out,
        "{}\n",
        style(format!("Files changed in the history of {}:", spec.target_path)).bold()
    )?;
    for (path, count) in files {
        if *path == spec.target_path {
            writeln!(out, "{:>5}  {} {}", count, style(path).cyan(), style("(target file)").dim())?;
        } else {
            writeln!(out, "{:>5}  {}", count, path)?;
        }
    }
    Ok(())
}

/// Render co-changed files as a two-column table
pub fn render_related(related: &RelatedFiles) -> Result<String> {
    let mut out = String::new();
    if related.files.is_empty() {
        writeln!(out, "No related files found for {}", related.target)?;
        return Ok(out);
    }

    writeln!(
        out,
        "{}\n",
        style(format!("Files modified together with {}:", related.target)).bold()
    )?;
    let width = related.files.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    writeln!(out, "{:<width$}  {}", "File", "Times", width = width)?;
    for (path, count) in &related.files {
        writeln!(
            out,
            "{:<width$}  {:>5}",
            style(path).cyan(),
            style(count).magenta(),
            width = width
        )?;
    }

    if related.files.len() < related.total {
        writeln!(
            out,
            "\nShowing top {} out of {} related files.",
            related.files.len(),
            related.total
        )?;
    }
    Ok(out)
}

/// Render the current pin
pub fn render_status(pin: Option<&Pin>) -> String {
    match pin {
        Some(pin) => format!("Pinned: {}\n", style(pin).cyan()),
        None => "No file is pinned.\n".to_string(),
    }
}
