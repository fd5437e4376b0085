//! In-memory backend for driving the reconstructor in tests.
//!
//! Every scripted commit touches the single tracked file. Diffs and blame
//! are derived from the scripted contents with the line diff, so they are
//! consistent with what `git` would report at zero context.

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};

use super::GitBackend;
use crate::diff::{diff_lines, LineOp};
use crate::models::{BlameLine, CommitRecord};

pub(crate) struct FakeBackend {
    path: String,
    /// Oldest first
    revisions: Vec<(CommitRecord, Option<String>)>,
    head_override: Option<Option<String>>,
    head_blame: Option<CommitRecord>,
    fail_listing: bool,
}

impl FakeBackend {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            revisions: Vec::new(),
            head_override: None,
            head_blame: None,
            fail_listing: false,
        }
    }

    /// Append a commit leaving the file with `content` (`None` deletes it).
    pub(crate) fn commit(mut self, message: &str, content: Option<&str>) -> Self {
        let n = self.revisions.len() as i64 + 1;
        let record = record(n, message);
        self.revisions
            .push((record, content.map(|c| c.to_string())));
        self
    }

    /// Content served for `HEAD` regardless of the scripted commits.
    pub(crate) fn with_head(mut self, content: Option<&str>) -> Self {
        self.head_override = Some(content.map(|c| c.to_string()));
        self
    }

    /// Blame every line of the `HEAD` override to a commit that never shows
    /// up in `list_commits_touching`.
    pub(crate) fn with_head_blame(mut self, message: &str) -> Self {
        self.head_blame = Some(record(1_000, message));
        self
    }

    /// Make `list_commits_touching` fail like an unreadable repository.
    pub(crate) fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    fn index_of(&self, revision: &str) -> Option<usize> {
        if revision == "HEAD" {
            return self.revisions.len().checked_sub(1);
        }
        self.revisions
            .iter()
            .position(|(record, _)| record.hash == revision)
    }

    fn content(&self, index: usize) -> &str {
        self.revisions[index].1.as_deref().unwrap_or("")
    }
}

impl GitBackend for FakeBackend {
    fn repository_id(&self) -> String {
        "fake://repo".to_string()
    }

    fn list_commits_touching(&self, file_path: &str) -> Result<Vec<CommitRecord>> {
        if self.fail_listing {
            return Err(anyhow!("repository is unreadable"));
        }
        if file_path != self.path {
            return Ok(Vec::new());
        }
        Ok(self
            .revisions
            .iter()
            .rev()
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn file_content_at(&self, revision: &str, file_path: &str) -> Result<Option<String>> {
        if file_path != self.path {
            return Ok(None);
        }
        if revision == "HEAD" {
            if let Some(head) = &self.head_override {
                return Ok(head.clone());
            }
        }
        Ok(self
            .index_of(revision)
            .and_then(|index| self.revisions[index].1.clone()))
    }

    fn diff_for(&self, revision: &str, file_path: &str) -> Result<String> {
        if file_path != self.path {
            return Ok(String::new());
        }
        let index = self
            .index_of(revision)
            .ok_or_else(|| anyhow!("unknown revision {}", revision))?;
        let old = if index == 0 { "" } else { self.content(index - 1) };
        Ok(unified_diff(old, self.content(index)))
    }

    fn blame_over(
        &self,
        revision: &str,
        file_path: &str,
        start_line: u32,
        end_line: u32,
    ) -> Result<Vec<BlameLine>> {
        if let (Some(Some(head)), Some(commit)) = (&self.head_override, &self.head_blame) {
            if revision == "HEAD" && file_path == self.path {
                return Ok(head
                    .lines()
                    .enumerate()
                    .map(|(i, line)| (i as u32 + 1, line))
                    .filter(|(number, _)| *number >= start_line && *number <= end_line)
                    .map(|(number, line)| BlameLine {
                        line_number: number,
                        content: line.to_string(),
                        commit: commit.clone(),
                    })
                    .collect());
            }
        }
        let Some(index) = self.index_of(revision) else {
            return Ok(Vec::new());
        };
        if file_path != self.path {
            return Ok(Vec::new());
        }

        // origin[i]: index of the commit that introduced line i
        let mut origin: Vec<usize> = Vec::new();
        let mut previous = "";
        for k in 0..=index {
            let current = self.content(k);
            let mut next = Vec::new();
            let mut old_line = 0;
            for op in diff_lines(previous, current) {
                match op {
                    LineOp::Same(_) => {
                        next.push(origin[old_line]);
                        old_line += 1;
                    }
                    LineOp::Removed(_) => old_line += 1,
                    LineOp::Added(_) => next.push(k),
                }
            }
            origin = next;
            previous = current;
        }

        Ok(previous
            .lines()
            .enumerate()
            .map(|(i, line)| (i as u32 + 1, line))
            .filter(|(number, _)| *number >= start_line && *number <= end_line)
            .map(|(number, line)| BlameLine {
                line_number: number,
                content: line.to_string(),
                commit: self.revisions[origin[number as usize - 1]].0.clone(),
            })
            .collect())
    }
}

fn record(n: i64, message: &str) -> CommitRecord {
    let timestamp = Utc.timestamp_opt(1_700_000_000 + n * 60, 0).unwrap();
    CommitRecord::new(
        format!("{:040x}", n),
        "Test User",
        "test@example.com",
        timestamp,
        message,
        7,
    )
}

/// Zero-context unified diff, hunk headers in `git` form.
fn unified_diff(old: &str, new: &str) -> String {
    let ops = diff_lines(old, new);
    let mut out = String::new();
    let (mut old_line, mut new_line) = (1u32, 1u32);
    let mut i = 0;
    while i < ops.len() {
        if matches!(ops[i], LineOp::Same(_)) {
            old_line += 1;
            new_line += 1;
            i += 1;
            continue;
        }
        let start = i;
        while i < ops.len() && !matches!(ops[i], LineOp::Same(_)) {
            i += 1;
        }
        let block = &ops[start..i];
        let removed = block
            .iter()
            .filter(|op| matches!(op, LineOp::Removed(_)))
            .count() as u32;
        let added = block.len() as u32 - removed;
        // An empty side points at the line before the change
        let old_start = if removed == 0 { old_line - 1 } else { old_line };
        let new_start = if added == 0 { new_line - 1 } else { new_line };
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start, removed, new_start, added
        ));
        for op in block {
            match op {
                LineOp::Removed(line) => out.push_str(&format!("-{}\n", line)),
                LineOp::Added(line) => out.push_str(&format!("+{}\n", line)),
                LineOp::Same(_) => {}
            }
        }
        old_line += removed;
        new_line += added;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_hunks;

    #[test]
    fn test_fake_diff_is_parseable() {
        let diff = unified_diff("a\nb\nc\n", "a\nx\nc\nd\n");
        let hunks = parse_hunks(&diff);
        assert_eq!(hunks.len(), 2);
        assert_eq!((hunks[0].new_start, hunks[0].new_count), (2, 1));
        assert_eq!(hunks[0].new_lines(), vec!["x"]);
        assert_eq!((hunks[1].new_start, hunks[1].new_count), (4, 1));
    }

    #[test]
    fn test_fake_blame_tracks_origin() -> Result<()> {
        let fake = FakeBackend::new("a.py")
            .commit("C1", Some("one\ntwo\n"))
            .commit("C2", Some("one\nTWO\nthree\n"));
        let blame = fake.blame_over("HEAD", "a.py", 1, 3)?;
        let subjects: Vec<&str> = blame.iter().map(|b| b.commit.subject.as_str()).collect();
        assert_eq!(subjects, vec!["C1", "C2", "C2"]);
        Ok(())
    }
}
