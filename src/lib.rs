//! pinlog - pin a file (or one line of it) and query its git history
//!
//! The library is the query engine behind the `pinlog` binary:
//!
//! - [`pin`]: the pinned target and its persistence
//! - [`git`]: the [`git::VcsGateway`] seam, backed by libgit2 or an in-memory fake
//! - [`history`]: query validation, history walking with line tracking, result shaping
//! - [`reporters`]: text and JSON rendering
//!
//! ```
//! use pinlog::git::{HunkRange, MemoryRepository};
//! use pinlog::history::{self, FilterSpec, HistoryRequest, QueryResult};
//! use pinlog::pin::Pin;
//!
//! let mut repo = MemoryRepository::new();
//! let c1 = repo.commit("Ada", "Add F").add_file("F", 5).finish();
//! let c2 = repo.commit("Ada", "Fix line 3").edit("F", vec![HunkRange::new(3, 1, 3, 1)]).finish();
//!
//! let pin = Pin::new("F", Some(3)).unwrap();
//! let spec = FilterSpec::resolve(&HistoryRequest::default(), Some(&pin)).unwrap();
//! let QueryResult::Summary(lines) = history::run(&repo, &spec).unwrap().result else { unreachable!() };
//! assert_eq!(lines.iter().map(|l| l.id.clone()).collect::<Vec<_>>(), vec![c2, c1]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod history;
pub mod pin;
pub mod reporters;

pub use error::{PinlogError, PinlogResult};
