//! libgit2-backed [`VcsGateway`]
//!
//! History is walked along the first-parent chain from HEAD, newest first,
//! following renames of the queried path the way `git log --follow` does.
//! Line stepping diffs the file's blob against the first parent's blob with
//! zero context lines and feeds the hunks to [`trace_line`].

use super::gateway::{
    CommitStream, LineChange, LineStep, LogQuery, RawCommit, VcsGateway,
};
use super::hunks::{count_lines, trace_line, HunkRange};
use crate::error::{PinlogError, PinlogResult};
use chrono::{DateTime, Utc};
use git2::{
    Blob, Commit, Delta, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, ObjectType, Oid,
    Patch, Repository, Revwalk, Sort, Tree,
};
use std::path::Path;
use tracing::debug;

/// Git repository opened through libgit2.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository containing `path` (any subdirectory works).
    pub fn open(path: &Path) -> PinlogResult<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                PinlogError::NotFound(format!("no git repository at {}", path.display()))
            } else {
                PinlogError::Git(e)
            }
        })?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self { repo })
    }

    /// Working directory root (the `.git` directory for bare repositories).
    pub fn root(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    fn head_commit(&self) -> PinlogResult<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_commit(&self, commit_id: &str) -> PinlogResult<Commit<'_>> {
        self.repo
            .revparse_single(commit_id)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| PinlogError::NotFound(format!("commit {}", commit_id)))
    }

    fn blob_at(&self, tree: &Tree<'_>, path: &str) -> PinlogResult<Option<Blob<'_>>> {
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        Ok(Some(self.repo.find_blob(entry.id())?))
    }

    fn blob_id(&self, tree: &Tree<'_>, path: &str) -> PinlogResult<Option<Oid>> {
        Ok(self.blob_at(tree, path)?.map(|blob| blob.id()))
    }

    /// Name of `path` in the parent tree, resolving a rename when the path
    /// only exists on the child side.
    fn parent_path(&self, parent_tree: &Tree<'_>, tree: &Tree<'_>, path: &str) -> PinlogResult<String> {
        if self.blob_id(parent_tree, path)?.is_some() || self.blob_id(tree, path)?.is_none() {
            return Ok(path.to_string());
        }

        let mut diff = self
            .repo
            .diff_tree_to_tree(Some(parent_tree), Some(tree), None)?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let renamed_from = diff
            .deltas()
            .find(|delta| {
                delta.status() == Delta::Renamed
                    && delta.new_file().path() == Some(Path::new(path))
            })
            .and_then(|delta| delta.old_file().path().map(path_to_string));

        if let Some(old) = &renamed_from {
            debug!("Followed rename {} -> {}", old, path);
        }
        Ok(renamed_from.unwrap_or_else(|| path.to_string()))
    }

    /// Every path a commit changed against its first parent.
    fn changed_paths(&self, commit: &Commit<'_>) -> PinlogResult<Vec<String>> {
        let tree = commit.tree()?;
        let parent_tree = commit.parent(0).ok().map(|p| p.tree()).transpose()?;
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        Ok(diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(path_to_string)
            })
            .collect())
    }

    fn raw_commit(&self, commit: &Commit<'_>, path: Option<String>) -> PinlogResult<RawCommit> {
        let author = commit.author();
        Ok(RawCommit {
            id: commit.id().to_string(),
            author: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            timestamp: git_time(&commit.time()),
            message: commit.message().unwrap_or("").to_string(),
            path,
            changed_paths: self.changed_paths(commit)?,
        })
    }

    fn revwalk(&self, head: Oid) -> PinlogResult<Revwalk<'_>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.simplify_first_parent()?;
        revwalk.push(head)?;
        Ok(revwalk)
    }
}

impl VcsGateway for GitRepository {
    fn enumerate_commits(&self, query: &LogQuery) -> PinlogResult<CommitStream<'_>> {
        let Some(head) = self.head_commit()? else {
            debug!("HEAD is unborn, no history to walk");
            return Ok(Box::new(std::iter::empty()));
        };

        let walk = CommitWalk {
            repo: self,
            revwalk: self.revwalk(head.id())?,
            path: query.path.clone(),
            query: query.clone(),
        };

        if !query.reverse {
            return Ok(Box::new(walk));
        }

        // Renames can only be followed newest to oldest, so reverse after the fact.
        let mut commits = walk.collect::<PinlogResult<Vec<_>>>()?;
        commits.reverse();
        Ok(Box::new(commits.into_iter().map(Ok)))
    }

    fn diff_for(&self, commit_id: &str, path: Option<&str>) -> PinlogResult<String> {
        let commit = self.find_commit(commit_id)?;
        let tree = commit.tree()?;
        let parent_tree = commit.parent(0).ok().map(|p| p.tree()).transpose()?;

        let mut diff_opts = DiffOptions::new();
        if let Some(path) = path {
            diff_opts.pathspec(path);
        }
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(text)
    }

    fn line_change(&self, commit_id: &str, path: &str, line: u32) -> PinlogResult<LineStep> {
        let commit = self.find_commit(commit_id)?;
        let tree = commit.tree()?;
        let step = |change| LineStep {
            change,
            parent_path: path.to_string(),
        };

        let Some(blob) = self.blob_at(&tree, path)? else {
            return Ok(step(LineChange::Absent));
        };
        if line == 0 || line > count_lines(blob.content()) {
            return Ok(step(LineChange::Absent));
        }

        let Ok(parent) = commit.parent(0) else {
            return Ok(step(LineChange::Introduced));
        };
        let parent_tree = parent.tree()?;
        let parent_path = self.parent_path(&parent_tree, &tree, path)?;

        let Some(parent_blob) = self.blob_at(&parent_tree, &parent_path)? else {
            return Ok(LineStep {
                change: LineChange::Introduced,
                parent_path,
            });
        };
        if parent_blob.id() == blob.id() {
            return Ok(LineStep {
                change: LineChange::Untouched { parent_line: line },
                parent_path,
            });
        }

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(0);
        let patch = Patch::from_blobs(
            &parent_blob,
            Some(Path::new(&parent_path)),
            &blob,
            Some(Path::new(path)),
            Some(&mut diff_opts),
        )?;

        let hunks = (0..patch.num_hunks())
            .map(|idx| {
                patch.hunk(idx).map(|(hunk, _)| {
                    HunkRange::new(
                        hunk.old_start(),
                        hunk.old_lines(),
                        hunk.new_start(),
                        hunk.new_lines(),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LineStep {
            change: trace_line(&hunks, line),
            parent_path,
        })
    }

    fn head_has_path(&self, path: &str) -> PinlogResult<Option<bool>> {
        let Some(head) = self.head_commit()? else {
            return Ok(None);
        };
        let tree = head.tree()?;
        Ok(Some(self.blob_id(&tree, path)?.is_some()))
    }
}

/// First-parent walk that yields commits touching a (possibly renamed) path.
struct CommitWalk<'repo> {
    repo: &'repo GitRepository,
    revwalk: Revwalk<'repo>,
    /// Current name of the tracked path; updated when a rename is crossed
    path: Option<String>,
    query: LogQuery,
}

impl Iterator for CommitWalk<'_> {
    type Item = PinlogResult<RawCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = match self.revwalk.next()? {
                Ok(oid) => oid,
                Err(e) => return Some(Err(e.into())),
            };
            match self.visit(oid) {
                Ok(Some(commit)) => return Some(Ok(commit)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl CommitWalk<'_> {
    fn visit(&mut self, oid: Oid) -> PinlogResult<Option<RawCommit>> {
        let commit = self.repo.repo.find_commit(oid)?;

        let Some(path) = self.path.clone() else {
            let raw = self.repo.raw_commit(&commit, None)?;
            return Ok(self.query.matches(&raw).then_some(raw));
        };

        let tree = commit.tree()?;
        let current_id = self.repo.blob_id(&tree, &path)?;
        let (parent_path, parent_id) = match commit.parent(0) {
            Ok(parent) => {
                let parent_tree = parent.tree()?;
                let parent_path = self.repo.parent_path(&parent_tree, &tree, &path)?;
                let parent_id = self.repo.blob_id(&parent_tree, &parent_path)?;
                (parent_path, parent_id)
            }
            Err(_) => (path.clone(), None),
        };

        let touched = current_id != parent_id || (current_id.is_some() && parent_path != path);
        self.path = Some(parent_path);
        if !touched {
            return Ok(None);
        }

        let raw = self.repo.raw_commit(&commit, Some(path))?;
        Ok(self.query.matches(&raw).then_some(raw))
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Convert a git timestamp to UTC.
fn git_time(time: &git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use git2::{Signature, Time};
    use tempfile::{tempdir, TempDir};

    /// Scratch repository with deterministic commit times.
    struct Scratch {
        dir: TempDir,
        repo: Repository,
        clock: i64,
    }

    impl Scratch {
        fn new() -> Result<Self> {
            let dir = tempdir()?;
            let repo = Repository::init(dir.path())?;
            Ok(Self {
                dir,
                repo,
                clock: 1_700_000_000,
            })
        }

        fn write(&self, path: &str, content: &str) -> Result<()> {
            let full = self.dir.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
            Ok(())
        }

        fn commit(&mut self, author: &str, message: &str, add: &[(&str, &str)], remove: &[&str]) -> Result<String> {
            for (path, content) in add {
                self.write(path, content)?;
            }
            let mut index = self.repo.index()?;
            for (path, _) in add {
                index.add_path(Path::new(path))?;
            }
            for path in remove {
                std::fs::remove_file(self.dir.path().join(path))?;
                index.remove_path(Path::new(path))?;
            }
            index.write()?;
            let tree = self.repo.find_tree(index.write_tree()?)?;

            self.clock += 3600;
            let sig = Signature::new(author, &format!("{}@example.com", author.to_lowercase()), &Time::new(self.clock, 0))?;
            let parents = match self.repo.head() {
                Ok(head) => vec![head.peel_to_commit()?],
                Err(_) => vec![],
            };
            let parent_refs: Vec<&Commit> = parents.iter().collect();
            let oid = self
                .repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?;
            Ok(oid.to_string())
        }

        fn gateway(&self) -> Result<GitRepository> {
            Ok(GitRepository::open(self.dir.path())?)
        }
    }

    fn ids(stream: CommitStream<'_>) -> Result<Vec<String>> {
        Ok(stream
            .map(|c| c.map(|c| c.id))
            .collect::<PinlogResult<Vec<_>>>()?)
    }

    /// F gets five lines, then line 3 is edited, then only G changes.
    fn three_commit_repo() -> Result<(Scratch, [String; 3])> {
        let mut scratch = Scratch::new()?;
        let c1 = scratch.commit(
            "Ada",
            "Add F and G",
            &[("f.txt", "one\ntwo\nthree\nfour\nfive\n"), ("g.txt", "g\n")],
            &[],
        )?;
        let c2 = scratch.commit(
            "Grace",
            "Edit line three",
            &[("f.txt", "one\ntwo\nTHREE\nfour\nfive\n")],
            &[],
        )?;
        let c3 = scratch.commit("Ada", "Touch G", &[("g.txt", "g2\n")], &[])?;
        Ok((scratch, [c1, c2, c3]))
    }

    #[test]
    fn test_open_non_repo_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        assert!(matches!(
            GitRepository::open(dir.path()),
            Err(PinlogError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_empty_repository_has_no_history() -> Result<()> {
        let scratch = Scratch::new()?;
        let gateway = scratch.gateway()?;
        assert!(ids(gateway.enumerate_commits(&LogQuery::for_path("f.txt"))?)?.is_empty());
        assert_eq!(gateway.head_has_path("f.txt")?, None);
        Ok(())
    }

    #[test]
    fn test_enumerate_file_history_newest_first() -> Result<()> {
        let (scratch, [c1, c2, c3]) = three_commit_repo()?;
        let gateway = scratch.gateway()?;

        let file = ids(gateway.enumerate_commits(&LogQuery::for_path("f.txt"))?)?;
        assert_eq!(file, vec![c2.clone(), c1.clone()]);

        let all = ids(gateway.enumerate_commits(&LogQuery::default())?)?;
        assert_eq!(all, vec![c3, c2.clone(), c1.clone()]);

        let reversed = ids(gateway.enumerate_commits(&LogQuery {
            reverse: true,
            ..LogQuery::for_path("f.txt")
        })?)?;
        assert_eq!(reversed, vec![c1, c2]);
        Ok(())
    }

    #[test]
    fn test_enumerate_pushes_down_author() -> Result<()> {
        let (scratch, [_, c2, _]) = three_commit_repo()?;
        let gateway = scratch.gateway()?;
        let query = LogQuery {
            author: Some("grace".to_string()),
            ..LogQuery::for_path("f.txt")
        };
        assert_eq!(ids(gateway.enumerate_commits(&query)?)?, vec![c2]);
        Ok(())
    }

    #[test]
    fn test_changed_paths_include_every_file() -> Result<()> {
        let (scratch, _) = three_commit_repo()?;
        let gateway = scratch.gateway()?;
        let commits = gateway
            .enumerate_commits(&LogQuery::for_path("f.txt"))?
            .collect::<PinlogResult<Vec<_>>>()?;
        assert_eq!(commits[0].changed_paths, vec!["f.txt".to_string()]);
        assert_eq!(
            commits[1].changed_paths,
            vec!["f.txt".to_string(), "g.txt".to_string()]
        );
        assert_eq!(commits[1].author, "Ada");
        assert_eq!(commits[1].message, "Add F and G");
        Ok(())
    }

    #[test]
    fn test_line_change_classifies_commits() -> Result<()> {
        let (scratch, [c1, c2, c3]) = three_commit_repo()?;
        let gateway = scratch.gateway()?;

        assert_eq!(
            gateway.line_change(&c2, "f.txt", 3)?.change,
            LineChange::Modified { parent_line: 3 }
        );
        assert_eq!(
            gateway.line_change(&c2, "f.txt", 4)?.change,
            LineChange::Untouched { parent_line: 4 }
        );
        assert_eq!(
            gateway.line_change(&c1, "f.txt", 3)?.change,
            LineChange::Introduced
        );
        assert_eq!(
            gateway.line_change(&c3, "f.txt", 3)?.change,
            LineChange::Untouched { parent_line: 3 }
        );
        assert_eq!(
            gateway.line_change(&c3, "f.txt", 99)?.change,
            LineChange::Absent
        );
        Ok(())
    }

    #[test]
    fn test_line_shifts_after_insertion_above() -> Result<()> {
        let mut scratch = Scratch::new()?;
        let c1 = scratch.commit("Ada", "init", &[("f.txt", "a\nb\nc\n")], &[])?;
        let c2 = scratch.commit("Ada", "insert", &[("f.txt", "a\nx\ny\nb\nc\n")], &[])?;
        let gateway = scratch.gateway()?;

        assert_eq!(
            gateway.line_change(&c2, "f.txt", 5)?.change,
            LineChange::Untouched { parent_line: 3 }
        );
        assert_eq!(
            gateway.line_change(&c2, "f.txt", 2)?.change,
            LineChange::Introduced
        );
        assert_eq!(gateway.resolve_line_at(&c1, "f.txt", 5)?, Some(3));
        assert_eq!(gateway.resolve_line_at(&c1, "f.txt", 2)?, None);
        assert_eq!(gateway.resolve_line_at(&c2, "f.txt", 2)?, Some(2));
        Ok(())
    }

    #[test]
    fn test_rename_is_followed() -> Result<()> {
        let mut scratch = Scratch::new()?;
        let c1 = scratch.commit("Ada", "create", &[("old.txt", "alpha\nbeta\ngamma\ndelta\n")], &[])?;
        let c2 = scratch.commit("Ada", "rename", &[("new.txt", "alpha\nbeta\ngamma\ndelta\n")], &["old.txt"])?;
        let gateway = scratch.gateway()?;

        let commits = gateway
            .enumerate_commits(&LogQuery::for_path("new.txt"))?
            .collect::<PinlogResult<Vec<_>>>()?;
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].id, c2);
        assert_eq!(commits[0].path.as_deref(), Some("new.txt"));
        assert_eq!(commits[1].id, c1);
        assert_eq!(commits[1].path.as_deref(), Some("old.txt"));

        let step = gateway.line_change(&c2, "new.txt", 2)?;
        assert_eq!(step.change, LineChange::Untouched { parent_line: 2 });
        assert_eq!(step.parent_path, "old.txt");
        Ok(())
    }

    #[test]
    fn test_diff_for_commit_and_path() -> Result<()> {
        let (scratch, [_, c2, _]) = three_commit_repo()?;
        let gateway = scratch.gateway()?;

        let diff = gateway.diff_for(&c2, Some("f.txt"))?;
        assert!(diff.contains("-three"));
        assert!(diff.contains("+THREE"));

        let other = gateway.diff_for(&c2, Some("g.txt"))?;
        assert!(other.is_empty());

        assert!(matches!(
            gateway.diff_for("0000000000000000000000000000000000000000", None),
            Err(PinlogError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_head_has_path() -> Result<()> {
        let (scratch, _) = three_commit_repo()?;
        let gateway = scratch.gateway()?;
        assert_eq!(gateway.head_has_path("f.txt")?, Some(true));
        assert_eq!(gateway.head_has_path("missing.txt")?, Some(false));
        Ok(())
    }
}
