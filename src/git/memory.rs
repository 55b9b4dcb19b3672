//! Scripted in-memory [`VcsGateway`]
//!
//! A linear history whose commits describe their file changes as explicit
//! hunks. No file contents are stored; each commit keeps a line-count
//! snapshot so line positions can be validated.
//!
//! ```
//! use pinlog::git::{HunkRange, MemoryRepository};
//!
//! let mut repo = MemoryRepository::new();
//! let c1 = repo.commit("Ada", "Add F").add_file("F", 5).finish();
//! let c2 = repo.commit("Grace", "Edit line 3").edit("F", vec![HunkRange::new(3, 1, 3, 1)]).finish();
//! assert_ne!(c1, c2);
//! ```

use super::gateway::{
    id_matches, CommitStream, LineChange, LineStep, LogQuery, RawCommit, VcsGateway,
};
use super::hunks::{trace_line, HunkRange};
use crate::error::{PinlogError, PinlogResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Added,
    Modified,
    Renamed,
    Deleted,
}

#[derive(Debug, Clone)]
struct FileChange {
    path: String,
    previous_path: Option<String>,
    kind: ChangeKind,
    hunks: Vec<HunkRange>,
}

#[derive(Debug, Clone)]
struct MemoryCommit {
    raw: RawCommit,
    changes: Vec<FileChange>,
    /// Line count of every file present after this commit
    line_counts: HashMap<String, u32>,
}

impl MemoryCommit {
    fn change_for(&self, path: &str) -> Option<&FileChange> {
        self.changes.iter().find(|c| c.path == path)
    }
}

/// Linear, scripted repository history.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    /// Oldest first
    commits: Vec<MemoryCommit>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a commit on top of the current history.
    ///
    /// Timestamps default to one day apart starting 2024-01-01 UTC.
    pub fn commit(&mut self, author: &str, message: &str) -> CommitBuilder<'_> {
        let index = self.commits.len();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap_or_default();
        let line_counts = self
            .commits
            .last()
            .map(|c| c.line_counts.clone())
            .unwrap_or_default();
        CommitBuilder {
            repo: self,
            id: format!("{:07x}{}", index + 1, "0".repeat(33)),
            author: author.to_string(),
            email: format!("{}@example.com", author.to_lowercase()),
            timestamp: base + Duration::days(index as i64),
            message: message.to_string(),
            changes: Vec::new(),
            line_counts,
        }
    }

    /// Number of commits in the history.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    fn position(&self, commit_id: &str) -> PinlogResult<usize> {
        self.commits
            .iter()
            .position(|c| id_matches(&c.raw.id, commit_id))
            .ok_or_else(|| PinlogError::NotFound(format!("commit {}", commit_id)))
    }
}

/// Accumulates the file changes of one scripted commit.
pub struct CommitBuilder<'a> {
    repo: &'a mut MemoryRepository,
    id: String,
    author: String,
    email: String,
    timestamp: DateTime<Utc>,
    message: String,
    changes: Vec<FileChange>,
    line_counts: HashMap<String, u32>,
}

impl CommitBuilder<'_> {
    /// Override the commit time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Create `path` with `lines` lines.
    pub fn add_file(mut self, path: &str, lines: u32) -> Self {
        self.line_counts.insert(path.to_string(), lines);
        self.changes.push(FileChange {
            path: path.to_string(),
            previous_path: None,
            kind: ChangeKind::Added,
            hunks: vec![HunkRange::created(lines)],
        });
        self
    }

    /// Apply zero-context `hunks` to an existing file.
    pub fn edit(mut self, path: &str, hunks: Vec<HunkRange>) -> Self {
        let delta: i64 = hunks
            .iter()
            .map(|h| i64::from(h.new_lines) - i64::from(h.old_lines))
            .sum();
        let count = self.line_counts.entry(path.to_string()).or_insert(0);
        *count = u32::try_from((i64::from(*count) + delta).max(0)).unwrap_or(0);
        self.changes.push(FileChange {
            path: path.to_string(),
            previous_path: None,
            kind: ChangeKind::Modified,
            hunks,
        });
        self
    }

    /// Rename `from` to `to`, optionally editing it in the same commit.
    pub fn rename(mut self, from: &str, to: &str, hunks: Vec<HunkRange>) -> Self {
        let count = self.line_counts.remove(from).unwrap_or(0);
        let delta: i64 = hunks
            .iter()
            .map(|h| i64::from(h.new_lines) - i64::from(h.old_lines))
            .sum();
        let count = u32::try_from((i64::from(count) + delta).max(0)).unwrap_or(0);
        self.line_counts.insert(to.to_string(), count);
        self.changes.push(FileChange {
            path: to.to_string(),
            previous_path: Some(from.to_string()),
            kind: ChangeKind::Renamed,
            hunks,
        });
        self
    }

    /// Remove `path`.
    pub fn delete(mut self, path: &str) -> Self {
        let lines = self.line_counts.remove(path).unwrap_or(0);
        self.changes.push(FileChange {
            path: path.to_string(),
            previous_path: None,
            kind: ChangeKind::Deleted,
            hunks: vec![HunkRange::new(1, lines, 0, 0)],
        });
        self
    }

    /// Append the commit and return its id.
    pub fn finish(self) -> String {
        let mut changed_paths: Vec<String> = Vec::new();
        for change in &self.changes {
            if !changed_paths.contains(&change.path) {
                changed_paths.push(change.path.clone());
            }
        }
        let raw = RawCommit {
            id: self.id.clone(),
            author: self.author,
            author_email: self.email,
            timestamp: self.timestamp,
            message: self.message,
            path: None,
            changed_paths,
        };
        self.repo.commits.push(MemoryCommit {
            raw,
            changes: self.changes,
            line_counts: self.line_counts,
        });
        self.id
    }
}

impl VcsGateway for MemoryRepository {
    fn enumerate_commits(&self, query: &LogQuery) -> PinlogResult<CommitStream<'_>> {
        let mut tracked = query.path.clone();
        let mut out = Vec::new();

        for commit in self.commits.iter().rev() {
            let mut raw = commit.raw.clone();
            if let Some(path) = tracked.clone() {
                let Some(change) = commit.change_for(&path) else {
                    continue;
                };
                if let Some(previous) = &change.previous_path {
                    tracked = Some(previous.clone());
                }
                raw.path = Some(path);
            }
            if query.matches(&raw) {
                out.push(raw);
            }
        }

        if query.reverse {
            out.reverse();
        }
        Ok(Box::new(out.into_iter().map(Ok)))
    }

    fn diff_for(&self, commit_id: &str, path: Option<&str>) -> PinlogResult<String> {
        let commit = &self.commits[self.position(commit_id)?];
        let mut text = String::new();
        for change in &commit.changes {
            if path.is_some_and(|p| p != change.path) {
                continue;
            }
            let old = change.previous_path.as_deref().unwrap_or(&change.path);
            text.push_str(&format!("diff --git a/{} b/{}\n", old, change.path));
            for hunk in &change.hunks {
                text.push_str(&format!(
                    "@@ -{},{} +{},{} @@\n",
                    hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
                ));
            }
        }
        Ok(text)
    }

    fn line_change(&self, commit_id: &str, path: &str, line: u32) -> PinlogResult<LineStep> {
        let index = self.position(commit_id)?;
        let commit = &self.commits[index];
        let step = |change, parent_path: &str| LineStep {
            change,
            parent_path: parent_path.to_string(),
        };

        let lines = commit.line_counts.get(path).copied().unwrap_or(0);
        if line == 0 || line > lines {
            return Ok(step(LineChange::Absent, path));
        }
        if index == 0 {
            return Ok(step(LineChange::Introduced, path));
        }

        let Some(change) = commit.change_for(path) else {
            return Ok(step(LineChange::Untouched { parent_line: line }, path));
        };
        let parent_path = change.previous_path.as_deref().unwrap_or(path);
        let change_kind = match change.kind {
            ChangeKind::Added => LineChange::Introduced,
            ChangeKind::Deleted => LineChange::Absent,
            ChangeKind::Modified | ChangeKind::Renamed => trace_line(&change.hunks, line),
        };
        Ok(step(change_kind, parent_path))
    }

    fn head_has_path(&self, path: &str) -> PinlogResult<Option<bool>> {
        Ok(self
            .commits
            .last()
            .map(|head| head.line_counts.contains_key(path)))
    }
}
