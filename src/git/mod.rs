//! Git access for the history engine
//!
//! Everything the engine needs from version control goes through the
//! [`VcsGateway`] trait:
//!
//! - commit enumeration for a path, with author/date/order push-down
//! - per-commit patches
//! - line-origin stepping (what did this commit do to line N?)
//!
//! [`GitRepository`] implements it over libgit2; [`MemoryRepository`] is a
//! scripted fake for tests.
//!
//! # Example
//!
//! ```no_run
//! use pinlog::git::{GitRepository, LogQuery, VcsGateway};
//! use std::path::Path;
//!
//! let repo = GitRepository::open(Path::new("/path/to/repo")).unwrap();
//! for commit in repo.enumerate_commits(&LogQuery::for_path("src/main.rs")).unwrap() {
//!     println!("{}", commit.unwrap().id);
//! }
//! ```

pub mod gateway;
pub mod hunks;
pub mod memory;
pub mod repository;

pub use gateway::{
    author_matches, CommitStream, LineChange, LineStep, LogQuery, RawCommit, VcsGateway,
};
pub use hunks::{trace_line, HunkRange};
pub use memory::{CommitBuilder, MemoryRepository};
pub use repository::GitRepository;
