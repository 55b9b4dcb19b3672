//! Version-control gateway: the seam between the history engine and a backend
//!
//! [`VcsGateway`] exposes exactly what the engine needs from a repository:
//! commit enumeration, per-commit patches, and line-origin stepping. The
//! libgit2 backend lives in [`super::repository`]; [`super::memory`] provides
//! a scripted in-memory backend for deterministic tests.

use crate::error::{PinlogError, PinlogResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Constraints pushed down to [`VcsGateway::enumerate_commits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Only commits that changed this path (renames are followed). `None` walks every commit.
    pub path: Option<String>,
    /// Case-insensitive substring of the author name or email
    pub author: Option<String>,
    /// Inclusive lower bound on the committer time
    pub after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the committer time
    pub before: Option<DateTime<Utc>>,
    /// Oldest first instead of newest first
    pub reverse: bool,
}

impl LogQuery {
    /// Query every commit that touched `path`, newest first, unfiltered.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Author and date predicates. Path and order are the gateway's job.
    pub fn matches(&self, commit: &RawCommit) -> bool {
        let author_ok = self
            .author
            .as_deref()
            .map_or(true, |needle| author_matches(needle, &commit.author, &commit.author_email));
        let after_ok = self.after.map_or(true, |after| commit.timestamp >= after);
        let before_ok = self.before.map_or(true, |before| commit.timestamp < before);
        author_ok && after_ok && before_ok
    }
}

/// Case-insensitive substring match against author name or email.
pub fn author_matches(needle: &str, name: &str, email: &str) -> bool {
    let needle = needle.to_lowercase();
    name.to_lowercase().contains(&needle) || email.to_lowercase().contains(&needle)
}

/// Commit metadata as produced by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawCommit {
    /// Full commit id (hex)
    pub id: String,
    pub author: String,
    pub author_email: String,
    /// Committer time
    pub timestamp: DateTime<Utc>,
    /// Full commit message
    pub message: String,
    /// The queried path as it was named at this commit (differs from the
    /// query path before a rename). `None` for path-less queries.
    pub path: Option<String>,
    /// Every path this commit changed against its first parent
    pub changed_paths: Vec<String>,
}

/// Lazy, finite, non-restartable commit sequence.
pub type CommitStream<'a> = Box<dyn Iterator<Item = PinlogResult<RawCommit>> + 'a>;

/// What a single commit did to one tracked line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineChange {
    /// The commit left the line alone; it sat at `parent_line` in the parent.
    Untouched { parent_line: u32 },
    /// The commit rewrote the line; its previous incarnation sat at `parent_line`.
    Modified { parent_line: u32 },
    /// The commit added the line (pure insertion, new file, or root commit).
    Introduced,
    /// The line does not exist in this commit's version of the file.
    Absent,
}

impl LineChange {
    /// Did this commit write the line?
    pub fn touched(&self) -> bool {
        matches!(self, LineChange::Modified { .. } | LineChange::Introduced)
    }

    /// Position in the parent, if tracking continues past this commit.
    pub fn parent_line(&self) -> Option<u32> {
        match *self {
            LineChange::Untouched { parent_line } | LineChange::Modified { parent_line } => {
                Some(parent_line)
            }
            LineChange::Introduced | LineChange::Absent => None,
        }
    }
}

/// Result of stepping a tracked line from a commit to its first parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStep {
    pub change: LineChange,
    /// Path of the file in the parent commit (differs across a rename)
    pub parent_path: String,
}

/// Read-only access to a repository's history.
pub trait VcsGateway {
    /// Commits matching `query`, newest first unless `query.reverse`.
    ///
    /// Walks the first-parent chain from HEAD. An unborn HEAD yields an empty
    /// stream. Each call re-walks history.
    fn enumerate_commits(&self, query: &LogQuery) -> PinlogResult<CommitStream<'_>>;

    /// Unified patch of `commit_id` against its first parent, limited to
    /// `path` when given. Fails with `NotFound` for unknown commits.
    fn diff_for(&self, commit_id: &str, path: Option<&str>) -> PinlogResult<String>;

    /// Classify what `commit_id` did to `line`, where `line` is positioned in
    /// the commit's own version of `path`.
    fn line_change(&self, commit_id: &str, path: &str, line: u32) -> PinlogResult<LineStep>;

    /// Whether HEAD's tree has a file at `path`; `None` when HEAD is unborn.
    fn head_has_path(&self, path: &str) -> PinlogResult<Option<bool>>;

    /// Map `line`, known at HEAD, to its position in `commit_id`'s version
    /// of the file.
    ///
    /// Returns `None` when the line did not exist at that commit. Tracking
    /// stops for good at the commit that introduced the line: an older line
    /// that happens to sit at the same position is never picked up again.
    fn resolve_line_at(
        &self,
        commit_id: &str,
        path: &str,
        line: u32,
    ) -> PinlogResult<Option<u32>> {
        let mut position = Some((path.to_string(), line));

        for commit in self.enumerate_commits(&LogQuery::default())? {
            let commit = commit?;
            let Some((current_path, current_line)) = position.take() else {
                return Ok(None);
            };

            let step = self.line_change(&commit.id, &current_path, current_line)?;
            if id_matches(&commit.id, commit_id) {
                return Ok((step.change != LineChange::Absent).then_some(current_line));
            }

            position = step
                .change
                .parent_line()
                .map(|parent_line| (step.parent_path, parent_line));
        }

        if position.is_none() {
            // Tracking ended before the walk reached the commit.
            return Ok(None);
        }
        Err(PinlogError::NotFound(format!(
            "commit {} is not on the first-parent history of HEAD",
            commit_id
        )))
    }
}

/// Full ids match themselves; abbreviated ids (7+ chars) match by prefix.
pub(crate) fn id_matches(full_id: &str, wanted: &str) -> bool {
    full_id == wanted || (wanted.len() >= 7 && full_id.starts_with(wanted))
}
