//! Commit-log traversal for a [`FilterSpec`]
//!
//! Without a tracked line every constraint is pushed down to the gateway and
//! re-checked here, so a gateway that ignores part of a [`LogQuery`] still
//! produces the same result.
//!
//! With a tracked line the gateway only narrows by path. The line position
//! has to be carried through every commit that touched the file, including
//! ones the author or date filters would drop, so those filters run after
//! tracking and `reverse` runs after collection.

use super::filter::FilterSpec;
use crate::error::{PinlogError, PinlogResult};
use crate::git::{LogQuery, RawCommit, VcsGateway};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Length of abbreviated commit ids.
pub const SHORT_ID_LEN: usize = 7;

/// One commit in a history result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub id: String,
    pub short_id: String,
    pub author: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Target path as named at this commit
    pub path: String,
    /// Position of the tracked line in this commit's version of the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_line: Option<u32>,
    /// Every path this commit changed
    pub changed_paths: Vec<String>,
}

impl CommitRecord {
    fn from_raw(raw: RawCommit, path: String, resolved_line: Option<u32>) -> Self {
        let short_id = raw.id.chars().take(SHORT_ID_LEN).collect();
        Self {
            id: raw.id,
            short_id,
            author: raw.author,
            author_email: raw.author_email,
            timestamp: raw.timestamp,
            message: raw.message,
            path,
            resolved_line,
            changed_paths: raw.changed_paths,
        }
    }

    /// First line of the commit message.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

/// Commits a walk produced, plus how many matched before the limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub records: Vec<CommitRecord>,
    /// Matching commits before `limit` was applied
    pub total: usize,
}

/// Runs a [`FilterSpec`] against a gateway.
pub struct HistoryWalker<'g, G: VcsGateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: VcsGateway + ?Sized> HistoryWalker<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    /// Matching commits in output order, at most `spec.limit` of them.
    pub fn walk(&self, spec: &FilterSpec) -> PinlogResult<Vec<CommitRecord>> {
        Ok(self.walk_counted(spec)?.records)
    }

    /// Like [`walk`](Self::walk), but also reports the untruncated count.
    pub fn walk_counted(&self, spec: &FilterSpec) -> PinlogResult<Walk> {
        if spec.explicit_target && self.gateway.head_has_path(&spec.target_path)? == Some(false) {
            return Err(PinlogError::NotFound(format!(
                "the file '{}' does not exist in the repository",
                spec.target_path
            )));
        }

        let mut records = match spec.target_line {
            Some(line) => self.walk_line(spec, line.get())?,
            None => self.walk_file(spec)?,
        };
        let total = records.len();
        if let Some(limit) = spec.limit {
            records.truncate(limit.get());
        }

        debug!(
            "History of {} ({} mode): {} of {} commit(s)",
            spec.target_path,
            spec.mode,
            records.len(),
            total
        );
        Ok(Walk { records, total })
    }

    fn walk_file(&self, spec: &FilterSpec) -> PinlogResult<Vec<CommitRecord>> {
        let query = spec.log_query();

        let mut records = Vec::new();
        for raw in self.gateway.enumerate_commits(&query)? {
            let raw = raw?;
            if !query.matches(&raw) {
                continue;
            }
            let path = raw.path.clone().unwrap_or_else(|| spec.target_path.clone());
            records.push(CommitRecord::from_raw(raw, path, None));
        }
        Ok(records)
    }

    /// Newest first regardless of `reverse`; the order is flipped at the end.
    fn walk_line(&self, spec: &FilterSpec, line: u32) -> PinlogResult<Vec<CommitRecord>> {
        let predicates = spec.log_query();

        let mut position = Some((spec.target_path.clone(), line));
        let mut records = Vec::new();

        for raw in self
            .gateway
            .enumerate_commits(&LogQuery::for_path(spec.target_path.clone()))?
        {
            let raw = raw?;
            let Some((path, line)) = position.take() else {
                break;
            };

            let step = self.gateway.line_change(&raw.id, &path, line)?;
            debug!(
                "{}: line {} of {} -> {:?}",
                &raw.id[..raw.id.len().min(SHORT_ID_LEN)],
                line,
                path,
                step.change
            );

            position = step.change.parent_line().map(|l| (step.parent_path, l));

            if step.change.touched() && predicates.matches(&raw) {
                records.push(CommitRecord::from_raw(raw, path, Some(line)));
            }
        }

        if spec.reverse {
            records.reverse();
        }
        Ok(records)
    }
}
