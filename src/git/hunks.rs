//! Zero-context hunk arithmetic for following one line through a diff
//!
//! Hunk coordinates follow the unified diff convention with no context
//! lines: a pure insertion has `old_lines == 0` and `old_start` naming the
//! old line it follows; a pure deletion has `new_lines == 0` and `new_start`
//! naming the new line it follows (0 at the top of the file).

use super::gateway::LineChange;

/// Line ranges of one hunk (1-indexed starts, counts may be zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

impl HunkRange {
    pub fn new(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    /// Hunk for a file created with `lines` lines.
    pub fn created(lines: u32) -> Self {
        Self::new(0, 0, 1, lines)
    }
}

/// Follow `line` (positioned in the new side) back to the old side.
///
/// `hunks` must be ordered by position, as diff engines emit them. A line
/// inside a rewritten hunk maps to the old line at the same offset, clamped
/// to the hunk's last old line.
pub fn trace_line(hunks: &[HunkRange], line: u32) -> LineChange {
    let mut offset: i64 = 0;

    for hunk in hunks {
        if hunk.new_lines > 0 {
            let end = hunk.new_start + hunk.new_lines;
            if line >= hunk.new_start && line < end {
                if hunk.old_lines == 0 {
                    return LineChange::Introduced;
                }
                let relative = (line - hunk.new_start).min(hunk.old_lines - 1);
                return LineChange::Modified {
                    parent_line: hunk.old_start + relative,
                };
            }
            if end > line {
                break;
            }
        } else if hunk.new_start >= line {
            break;
        }
        offset += i64::from(hunk.old_lines) - i64::from(hunk.new_lines);
    }

    let parent_line = (i64::from(line) + offset).max(1);
    LineChange::Untouched {
        parent_line: u32::try_from(parent_line).unwrap_or(u32::MAX),
    }
}

/// Number of lines in a blob, counting a trailing unterminated line.
pub fn count_lines(content: &[u8]) -> u32 {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    let total = if content.ends_with(b"\n") {
        newlines
    } else {
        newlines + 1
    };
    u32::try_from(total).unwrap_or(u32::MAX)
}
