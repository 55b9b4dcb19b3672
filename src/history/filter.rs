//! Query construction and validation
//!
//! [`HistoryRequest`] is what a caller asked for: raw strings and flags,
//! possibly contradictory. [`FilterSpec::resolve`] turns it plus the active
//! [`Pin`] into a validated, immutable query.

use crate::error::{PinlogError, PinlogResult};
use crate::git::LogQuery;
use crate::pin::{normalize_repo_path, Pin};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};

/// Date format accepted by `--after` / `--before`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Unvalidated history arguments, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRequest {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub author: Option<String>,
    /// `YYYY-MM-DD`
    pub after: Option<String>,
    /// `YYYY-MM-DD`
    pub before: Option<String>,
    pub limit: Option<usize>,
    pub reverse: bool,
    pub ignore_line: bool,
    pub summary: bool,
    pub traverse: bool,
    pub files_changed: bool,
}

/// How results are shaped. Exactly one mode is active per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One line per commit
    #[default]
    Summary,
    /// Every commit with its full diff
    Traversal,
    /// Files touched across the matching commits, with counts
    FilesChanged,
}

impl OutputMode {
    /// Pick the mode from the three mutually exclusive flags.
    /// No flag means [`OutputMode::Summary`].
    pub fn from_flags(summary: bool, traverse: bool, files_changed: bool) -> PinlogResult<Self> {
        let selected: Vec<(&'static str, OutputMode)> = [
            (summary, "--summary", OutputMode::Summary),
            (traverse, "--traverse", OutputMode::Traversal),
            (files_changed, "--files-changed", OutputMode::FilesChanged),
        ]
        .into_iter()
        .filter(|(on, _, _)| *on)
        .map(|(_, flag, mode)| (flag, mode))
        .collect();

        match selected.as_slice() {
            [] => Ok(OutputMode::Summary),
            [(_, mode)] => Ok(*mode),
            _ => Err(PinlogError::ConflictingOptions(
                selected.iter().map(|(flag, _)| *flag).collect(),
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Summary => write!(f, "summary"),
            OutputMode::Traversal => write!(f, "traverse"),
            OutputMode::FilesChanged => write!(f, "files-changed"),
        }
    }
}

/// A validated history query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    /// Repository-relative file the query is about
    pub target_path: String,
    /// Line to track. Always `None` with `ignore_line` or in files-changed mode.
    pub target_line: Option<NonZeroU32>,
    pub author: Option<String>,
    /// Inclusive, UTC midnight
    pub after: Option<DateTime<Utc>>,
    /// UTC midnight starting the last day included
    pub before: Option<DateTime<Utc>>,
    pub reverse: bool,
    pub limit: Option<NonZeroUsize>,
    pub ignore_line: bool,
    pub mode: OutputMode,
    /// The target came from `--file` rather than the pin
    pub explicit_target: bool,
    /// Pinned line that `ignore_line` switched off
    pub ignored_line: Option<NonZeroU32>,
}

impl FilterSpec {
    /// Validate `request` and resolve its target against `pin`.
    ///
    /// Target precedence: `--file` (with `--line` if given), then the pinned
    /// path (where `--line` replaces the pinned line), otherwise
    /// [`PinlogError::NoPin`].
    pub fn resolve(request: &HistoryRequest, pin: Option<&Pin>) -> PinlogResult<Self> {
        let mode = OutputMode::from_flags(request.summary, request.traverse, request.files_changed)?;

        let explicit_line = request.line.map(parse_line).transpose()?;
        let (target_path, line, explicit_target) = match (&request.file, pin) {
            (Some(file), _) => (normalize_repo_path(file)?, explicit_line, true),
            (None, Some(pin)) => (pin.path.clone(), explicit_line.or(pin.line), false),
            (None, None) => return Err(PinlogError::NoPin),
        };

        let after = request.after.as_deref().map(parse_date).transpose()?;
        let before = request.before.as_deref().map(parse_date).transpose()?;
        if let (Some(a), Some(b)) = (after, before) {
            if b < a {
                return Err(PinlogError::InvalidRange {
                    after: request.after.clone().unwrap_or_default(),
                    before: request.before.clone().unwrap_or_default(),
                });
            }
        }

        let limit = request
            .limit
            .map(|n| {
                NonZeroUsize::new(n).ok_or_else(|| {
                    PinlogError::InvalidArgument("--limit must be a positive integer".to_string())
                })
            })
            .transpose()?;

        let author = request
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        let tracks_lines = !request.ignore_line && mode != OutputMode::FilesChanged;
        let target_line = line.filter(|_| tracks_lines);
        let ignored_line = line.filter(|_| request.ignore_line);

        Ok(Self {
            target_path,
            target_line,
            author,
            after,
            before,
            reverse: request.reverse,
            limit,
            ignore_line: request.ignore_line,
            mode,
            explicit_target,
            ignored_line,
        })
    }

    /// Whether the query follows a single line rather than the whole file.
    pub fn tracks_line(&self) -> bool {
        self.target_line.is_some()
    }

    /// Gateway query with every constraint pushed down.
    pub fn log_query(&self) -> LogQuery {
        LogQuery {
            path: Some(self.target_path.clone()),
            author: self.author.clone(),
            after: self.after,
            // The whole `before` day is included.
            before: self.before.map(|day| day + Duration::days(1)),
            reverse: self.reverse,
        }
    }
}

/// Parse `YYYY-MM-DD` as UTC midnight.
pub fn parse_date(value: &str) -> PinlogResult<DateTime<Utc>> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            PinlogError::InvalidArgument(format!(
                "date '{}' must be in the format YYYY-MM-DD",
                value
            ))
        })
}

fn parse_line(line: u32) -> PinlogResult<NonZeroU32> {
    NonZeroU32::new(line)
        .ok_or_else(|| PinlogError::InvalidArgument("--line must be at least 1".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pin(path: &str, line: Option<u32>) -> Pin {
        Pin::new(path, line).unwrap()
    }

    fn request() -> HistoryRequest {
        HistoryRequest::default()
    }

    #[test]
    fn test_no_flags_means_summary() {
        assert_eq!(OutputMode::from_flags(false, false, false).unwrap(), OutputMode::Summary);
        assert_eq!(OutputMode::from_flags(false, true, false).unwrap(), OutputMode::Traversal);
        assert_eq!(
            OutputMode::from_flags(false, false, true).unwrap(),
            OutputMode::FilesChanged
        );
    }

    #[test]
    fn test_every_pair_of_modes_conflicts() {
        let pairs = [
            (true, true, false),
            (true, false, true),
            (false, true, true),
            (true, true, true),
        ];
        for (summary, traverse, files_changed) in pairs {
            let err = OutputMode::from_flags(summary, traverse, files_changed).unwrap_err();
            assert!(matches!(err, PinlogError::ConflictingOptions(ref flags) if flags.len() >= 2));
        }
    }

    #[test]
    fn test_conflict_is_reported_from_resolve() {
        let req = HistoryRequest {
            traverse: true,
            files_changed: true,
            ..request()
        };
        let err = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap_err();
        assert!(matches!(
            err,
            PinlogError::ConflictingOptions(flags) if flags == vec!["--traverse", "--files-changed"]
        ));
    }

    #[test]
    fn test_no_pin_and_no_file_fails() {
        assert!(matches!(
            FilterSpec::resolve(&request(), None),
            Err(PinlogError::NoPin)
        ));
        let with_line = HistoryRequest {
            line: Some(4),
            ..request()
        };
        assert!(matches!(
            FilterSpec::resolve(&with_line, None),
            Err(PinlogError::NoPin)
        ));
    }

    #[test]
    fn test_pin_supplies_target() {
        let spec = FilterSpec::resolve(&request(), Some(&pin("src/lib.rs", Some(3)))).unwrap();
        assert_eq!(spec.target_path, "src/lib.rs");
        assert_eq!(spec.target_line.map(NonZeroU32::get), Some(3));
        assert!(!spec.explicit_target);
        assert!(spec.tracks_line());
    }

    #[test]
    fn test_explicit_file_overrides_pin() {
        let req = HistoryRequest {
            file: Some("./other.rs".to_string()),
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("src/lib.rs", Some(3)))).unwrap();
        assert_eq!(spec.target_path, "other.rs");
        assert_eq!(spec.target_line, None);
        assert!(spec.explicit_target);
    }

    #[test]
    fn test_explicit_line_overrides_pinned_line() {
        let req = HistoryRequest {
            line: Some(9),
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("F", Some(3)))).unwrap();
        assert_eq!(spec.target_line.map(NonZeroU32::get), Some(9));
    }

    #[test]
    fn test_ignore_line_drops_target_line() {
        let req = HistoryRequest {
            ignore_line: true,
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("F", Some(3)))).unwrap();
        assert_eq!(spec.target_line, None);
        assert_eq!(spec.ignored_line.map(NonZeroU32::get), Some(3));
        assert!(!spec.tracks_line());
    }

    #[test]
    fn test_files_changed_never_tracks_lines() {
        let req = HistoryRequest {
            files_changed: true,
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("F", Some(3)))).unwrap();
        assert_eq!(spec.mode, OutputMode::FilesChanged);
        assert_eq!(spec.target_line, None);
        assert_eq!(spec.ignored_line, None);
    }

    #[test]
    fn test_zero_limit_and_zero_line_are_invalid() {
        let zero_limit = HistoryRequest {
            limit: Some(0),
            ..request()
        };
        assert!(matches!(
            FilterSpec::resolve(&zero_limit, Some(&pin("F", None))),
            Err(PinlogError::InvalidArgument(_))
        ));
        let zero_line = HistoryRequest {
            line: Some(0),
            ..request()
        };
        assert!(matches!(
            FilterSpec::resolve(&zero_line, Some(&pin("F", None))),
            Err(PinlogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dates_parse_to_utc_midnight() {
        let req = HistoryRequest {
            after: Some("2024-01-02".to_string()),
            before: Some("2024-02-29".to_string()),
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap();
        assert_eq!(spec.after, Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
        assert_eq!(spec.before, Some(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_malformed_date_is_invalid_argument() {
        for bad in ["yesterday", "2024-13-01", "01/02/2024", ""] {
            let req = HistoryRequest {
                after: Some(bad.to_string()),
                ..request()
            };
            assert!(
                matches!(
                    FilterSpec::resolve(&req, Some(&pin("F", None))),
                    Err(PinlogError::InvalidArgument(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_before_preceding_after_is_invalid_range() {
        let req = HistoryRequest {
            after: Some("2024-03-01".to_string()),
            before: Some("2024-02-01".to_string()),
            ..request()
        };
        let err = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap_err();
        assert!(matches!(err, PinlogError::InvalidRange { ref after, .. } if after == "2024-03-01"));

        let same_day = HistoryRequest {
            after: Some("2024-03-01".to_string()),
            before: Some("2024-03-01".to_string()),
            ..request()
        };
        assert!(FilterSpec::resolve(&same_day, Some(&pin("F", None))).is_ok());
    }

    #[test]
    fn test_blank_author_means_no_filter() {
        let req = HistoryRequest {
            author: Some("   ".to_string()),
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap();
        assert_eq!(spec.author, None);

        let req = HistoryRequest {
            author: Some(" Ada ".to_string()),
            ..request()
        };
        let spec = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap();
        assert_eq!(spec.author.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_log_query_pushes_everything_down() {
        let req = HistoryRequest {
            author: Some("ada".to_string()),
            after: Some("2024-01-01".to_string()),
            reverse: true,
            ..request()
        };
        let query = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap().log_query();
        assert_eq!(query.path.as_deref(), Some("F"));
        assert_eq!(query.author.as_deref(), Some("ada"));
        assert!(query.after.is_some());
        assert!(query.reverse);
    }

    #[test]
    fn test_log_query_keeps_the_whole_before_day() {
        let req = HistoryRequest {
            after: Some("2024-03-05".to_string()),
            before: Some("2024-03-05".to_string()),
            ..request()
        };
        let query = FilterSpec::resolve(&req, Some(&pin("F", None))).unwrap().log_query();
        assert_eq!(query.after, Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()));
        assert_eq!(query.before, Some(Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap()));
    }
}
