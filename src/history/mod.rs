//! Pin-scoped history queries
//!
//! ```text
//! HistoryRequest + Pin ──► FilterSpec ──► HistoryWalker ──► ResultAggregator ──► QueryResult
//!                                              │
//!                                         VcsGateway
//! ```

pub mod aggregate;
pub mod filter;
pub mod walker;

pub use aggregate::{
    count_changed_paths, related_files, QueryResult, RelatedFiles, ResultAggregator, SummaryLine,
    TraversalEntry,
};
pub use filter::{parse_date, FilterSpec, HistoryRequest, OutputMode};
pub use walker::{CommitRecord, HistoryWalker, Walk};

use crate::error::{PinlogError, PinlogResult};
use crate::git::VcsGateway;
use crate::pin::Pin;
use serde::Serialize;

/// A shaped result and how many commits it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub result: QueryResult,
    /// Commits the result covers
    pub shown: usize,
    /// Commits that matched before `limit` was applied
    pub total: usize,
}

impl QueryOutcome {
    /// Whether `limit` hid some matching commits.
    pub fn is_truncated(&self) -> bool {
        self.total > self.shown
    }
}

/// Walk and aggregate `spec` in one go.
pub fn run<G: VcsGateway + ?Sized>(gateway: &G, spec: &FilterSpec) -> PinlogResult<QueryOutcome> {
    let walk = HistoryWalker::new(gateway).walk_counted(spec)?;
    let result = ResultAggregator::new(gateway).aggregate(spec.mode, &walk.records)?;
    Ok(QueryOutcome {
        result,
        shown: walk.records.len(),
        total: walk.total,
    })
}

/// Files most often changed together with the pinned file, over its whole
/// history.
pub fn related<G: VcsGateway + ?Sized>(
    gateway: &G,
    pin: Option<&Pin>,
    limit: Option<usize>,
) -> PinlogResult<RelatedFiles> {
    if limit == Some(0) {
        return Err(PinlogError::InvalidArgument(
            "--limit must be a positive integer".to_string(),
        ));
    }
    let request = HistoryRequest {
        files_changed: true,
        ..HistoryRequest::default()
    };
    let spec = FilterSpec::resolve(&request, pin)?;
    let records = HistoryWalker::new(gateway).walk(&spec)?;
    Ok(related_files(&records, &spec.target_path, limit))
}
