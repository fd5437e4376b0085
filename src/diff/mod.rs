//! Unified diff hunk parsing
//!
//! Parses the patch text a backend returns for one file in one commit into
//! [`DiffHunk`]s, and provides the line-range overlap test used to decide
//! whether a commit touched an entity.
//!
//! Parsing is tolerant: a malformed `@@` header drops that hunk (and its
//! body) but never the hunks around it.

mod lines;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::EntitySpan;

pub use lines::{changed_lines, diff_lines, LineOp};

/// One contiguous change region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Raw body lines, markers intact
    pub lines: Vec<String>,
}

impl DiffHunk {
    /// The new-side view of the hunk: context and added lines without their
    /// marker, removed lines dropped. Entry `i` is line `new_start + i` of
    /// the file after the commit.
    pub fn new_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| {
                if let Some(added) = line.strip_prefix('+') {
                    Some(added)
                } else {
                    line.strip_prefix(' ')
                }
            })
            .collect()
    }

    /// New-side lines paired with their absolute line numbers.
    pub fn numbered_new_lines(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        let start = self.new_start;
        self.new_lines()
            .into_iter()
            .enumerate()
            .map(move |(offset, line)| (start + offset as u32, line))
    }

    /// Last new-side line the hunk reaches, as used by the overlap test.
    pub fn new_end(&self) -> u32 {
        self.new_start + self.new_count
    }

    /// Whether this hunk's new range intersects the span.
    pub fn touches(&self, span: &EntitySpan) -> bool {
        overlaps(self.new_start, self.new_end(), span.start_line, span.end_line)
    }
}

/// Inclusive range intersection. Ranges that share an endpoint overlap.
pub fn overlaps(start1: u32, end1: u32, start2: u32, end2: u32) -> bool {
    start1 <= end2 && start2 <= end1
}

/// Whether any hunk touches the span.
pub fn any_touches(hunks: &[DiffHunk], span: &EntitySpan) -> bool {
    hunks.iter().any(|hunk| hunk.touches(span))
}

/// Parse the unified diff of a single file into hunks.
pub fn parse_hunks(diff_text: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    // None before the first header and after a malformed one, so stray
    // body lines fall on the floor
    let mut current: Option<DiffHunk> = None;

    for line in diff_text.split('\n') {
        if line.starts_with("@@") {
            if let Some(hunk) = current.take() {
                hunks.push(finish(hunk));
            }
            match parse_header(line) {
                Some((old_start, old_count, new_start, new_count)) => {
                    current = Some(DiffHunk {
                        old_start,
                        old_count,
                        new_start,
                        new_count,
                        lines: Vec::new(),
                    });
                }
                None => debug!("Skipping malformed hunk header: {}", line),
            }
        } else if let Some(hunk) = current.as_mut() {
            hunk.lines.push(line.trim_end_matches('\r').to_string());
        }
    }

    if let Some(hunk) = current {
        hunks.push(finish(hunk));
    }

    hunks
}

/// Drop the trailing empty lines left by the final newline of the patch.
fn finish(mut hunk: DiffHunk) -> DiffHunk {
    while hunk.lines.last().is_some_and(|l| l.is_empty()) {
        hunk.lines.pop();
    }
    hunk
}

/// Parse `@@ -a[,b] +c[,d] @@ optional section`.
fn parse_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let ranges = line.strip_prefix("@@")?.split("@@").next()?.trim();
    let mut parts = ranges.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    if parts.next().is_some() {
        return None;
    }
    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    Some((old_start, old_count, new_start, new_count))
}

/// `"10,5"` -> `(10, 5)`, `"10"` -> `(10, 1)`.
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;

    fn span(start: u32, end: u32) -> EntitySpan {
        EntitySpan {
            name: "foo".into(),
            kind: EntityKind::Function,
            start_line: start,
            end_line: end,
            signature: String::new(),
            parent: None,
        }
    }

    #[test]
    fn test_overlap_endpoints() {
        assert!(overlaps(10, 20, 20, 30));
        assert!(!overlaps(10, 19, 20, 30));
        assert!(overlaps(20, 30, 10, 20));
        assert!(overlaps(1, 100, 40, 41));
    }

    #[test]
    fn test_parse_basic_hunk() {
        let diff = "@@ -5,3 +5,4 @@\n ctx one\n ctx two\n ctx three\n+added\n";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(
            (hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count),
            (5, 3, 5, 4)
        );
        assert_eq!(
            hunk.new_lines(),
            vec!["ctx one", "ctx two", "ctx three", "added"]
        );
    }

    #[test]
    fn test_missing_count_defaults_to_one() {
        let hunks = parse_hunks("@@ -3 +3 @@\n-old\n+new\n");
        assert_eq!(hunks[0].old_count, 1);
        assert_eq!(hunks[0].new_count, 1);
        assert_eq!(hunks[0].new_lines(), vec!["new"]);
    }

    #[test]
    fn test_file_headers_and_section_names_ignored() {
        let diff = "diff --git a/x.py b/x.py\nindex 1..2 100644\n--- a/x.py\n+++ b/x.py\n@@ -1,2 +1,2 @@ def foo():\n-    return 1\n+    return 2\n     pass\n";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 3);
        assert_eq!(hunks[0].new_lines(), vec!["    return 2", "    pass"]);
    }

    #[test]
    fn test_malformed_header_drops_only_that_hunk() {
        let diff = "@@ -1,1 +1,1 @@\n-a\n+b\n@@ -x,1 +2,1 @@\n-c\n+d\n@@ -9,1 +9,2 @@\n e\n+f\n";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].new_lines(), vec!["b"]);
        assert_eq!(hunks[1].new_start, 9);
        assert_eq!(hunks[1].new_lines(), vec!["e", "f"]);
    }

    #[test]
    fn test_no_newline_marker_excluded() {
        let diff = "@@ -1 +1 @@\n-a\n\\ No newline at end of file\n+b\n\\ No newline at end of file\n";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks[0].new_lines(), vec!["b"]);
    }

    #[test]
    fn test_numbered_new_lines() {
        let hunks = parse_hunks("@@ -10,2 +12,3 @@\n a\n-b\n+c\n+d\n");
        let numbered: Vec<(u32, &str)> = hunks[0].numbered_new_lines().collect();
        assert_eq!(numbered, vec![(12, "a"), (13, "c"), (14, "d")]);
    }

    #[test]
    fn test_touches_span() {
        let hunks = parse_hunks("@@ -1,2 +1,2 @@\n-a\n+b\n c\n");
        assert!(any_touches(&hunks, &span(2, 4)));
        assert!(any_touches(&hunks, &span(3, 4)));
        assert!(!any_touches(&hunks, &span(4, 9)));
    }

    #[test]
    fn test_empty_diff() {
        assert!(parse_hunks("").is_empty());
    }
}
