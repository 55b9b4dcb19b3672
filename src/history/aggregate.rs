//! Shape walker output for presentation
//!
//! - Summary: one [`SummaryLine`] per commit
//! - Traversal: each commit paired with its diff
//! - FilesChanged: path counts folded over every commit, busiest first
//!
//! Counts use an [`IndexMap`] with a stable sort, so files with equal counts
//! stay in the order they were first seen (newest commit first, unless the
//! walk was reversed).

use super::filter::OutputMode;
use super::walker::CommitRecord;
use crate::error::PinlogResult;
use crate::git::VcsGateway;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// One-line view of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub id: String,
    pub short_id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_line: Option<u32>,
}

impl From<&CommitRecord> for SummaryLine {
    fn from(record: &CommitRecord) -> Self {
        Self {
            id: record.id.clone(),
            short_id: record.short_id.clone(),
            author: record.author.clone(),
            timestamp: record.timestamp,
            headline: record.headline().to_string(),
            resolved_line: record.resolved_line,
        }
    }
}

/// A commit with its patch against the first parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraversalEntry {
    #[serde(flatten)]
    pub record: CommitRecord,
    pub diff: String,
}

/// A history query result, one variant per [`OutputMode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "entries", rename_all = "snake_case")]
pub enum QueryResult {
    Summary(Vec<SummaryLine>),
    Traversal(Vec<TraversalEntry>),
    FilesChanged(IndexMap<String, usize>),
}

impl QueryResult {
    pub fn mode(&self) -> OutputMode {
        match self {
            QueryResult::Summary(_) => OutputMode::Summary,
            QueryResult::Traversal(_) => OutputMode::Traversal,
            QueryResult::FilesChanged(_) => OutputMode::FilesChanged,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            QueryResult::Summary(lines) => lines.is_empty(),
            QueryResult::Traversal(entries) => entries.is_empty(),
            QueryResult::FilesChanged(files) => files.is_empty(),
        }
    }
}

/// Files changed together with a target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedFiles {
    pub target: String,
    /// Busiest first, at most `limit` entries
    pub files: IndexMap<String, usize>,
    /// Number of related files before the limit was applied
    pub total: usize,
}

/// Builds [`QueryResult`]s, fetching diffs through the gateway when needed.
pub struct ResultAggregator<'g, G: VcsGateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: VcsGateway + ?Sized> ResultAggregator<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    pub fn aggregate(&self, mode: OutputMode, records: &[CommitRecord]) -> PinlogResult<QueryResult> {
        Ok(match mode {
            OutputMode::Summary => QueryResult::Summary(summarize(records)),
            OutputMode::Traversal => QueryResult::Traversal(self.traverse(records)?),
            OutputMode::FilesChanged => QueryResult::FilesChanged(count_changed_paths(records)),
        })
    }

    fn traverse(&self, records: &[CommitRecord]) -> PinlogResult<Vec<TraversalEntry>> {
        records
            .iter()
            .map(|record| {
                let diff = self.gateway.diff_for(&record.id, Some(&record.path))?;
                Ok(TraversalEntry {
                    record: record.clone(),
                    diff,
                })
            })
            .collect()
    }
}

pub fn summarize(records: &[CommitRecord]) -> Vec<SummaryLine> {
    records.iter().map(SummaryLine::from).collect()
}

/// How often each path was changed across `records`, busiest first.
pub fn count_changed_paths(records: &[CommitRecord]) -> IndexMap<String, usize> {
    let mut counts = fold_paths(records, |_| true);
    sort_by_count(&mut counts);
    counts
}

/// Files changed alongside the target, excluding the target itself under
/// any of its historical names.
pub fn related_files(records: &[CommitRecord], target: &str, limit: Option<usize>) -> RelatedFiles {
    let names: HashSet<&str> = records
        .iter()
        .map(|r| r.path.as_str())
        .chain(std::iter::once(target))
        .collect();
    let mut files = fold_paths(records, |path| !names.contains(path));
    sort_by_count(&mut files);
    let total = files.len();
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    RelatedFiles {
        target: target.to_string(),
        files,
        total,
    }
}

fn fold_paths<F>(records: &[CommitRecord], keep: F) -> IndexMap<String, usize>
where
    F: Fn(&str) -> bool,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        for path in &record.changed_paths {
            if keep(path) {
                *counts.entry(path.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
}

// IndexMap::sort_by is stable, so ties keep first-seen order.
fn sort_by_count(counts: &mut IndexMap<String, usize>) {
    counts.sort_by(|_, a, _, b| b.cmp(a));
}
