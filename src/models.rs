//! Core data models for fnhist
//!
//! These types describe commits, located entities, diff hunks and the
//! timelines built from them. Everything here is plain owned data so that
//! reporters can serialize it without touching the git backend again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HistoryError;

/// Identity of a single revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit hash
    pub hash: String,
    /// Abbreviated hash for display
    pub short_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    /// Full commit message
    pub message: String,
    /// First line of the message, trimmed
    pub subject: String,
}

impl CommitRecord {
    /// Build a record, deriving the abbreviated hash and subject line.
    pub fn new(
        hash: impl Into<String>,
        author_name: impl Into<String>,
        author_email: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        short_hash_len: usize,
    ) -> Self {
        let hash = hash.into();
        let message = message.into();
        let short_hash = hash[..hash.len().min(short_hash_len)].to_string();
        let subject = message.lines().next().unwrap_or("").trim().to_string();
        Self {
            hash,
            short_hash,
            author_name: author_name.into(),
            author_email: author_email.into(),
            timestamp,
            message,
            subject,
        }
    }
}

/// The kinds of declaration the locator can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Function,
    Class,
    Struct,
    Enum,
    Interface,
    Impl,
}

impl EntityKind {
    /// Auto-detection order. Type-like kinds win over functions because a
    /// type and a function may share a name.
    pub const AUTO_ORDER: [EntityKind; 6] = [
        EntityKind::Struct,
        EntityKind::Class,
        EntityKind::Enum,
        EntityKind::Interface,
        EntityKind::Impl,
        EntityKind::Function,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Function => "function",
            EntityKind::Class => "class",
            EntityKind::Struct => "struct",
            EntityKind::Enum => "enum",
            EntityKind::Interface => "interface",
            EntityKind::Impl => "impl",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which kind a lookup asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindQuery {
    /// Try every kind in [`EntityKind::AUTO_ORDER`]
    #[default]
    Auto,
    Exact(EntityKind),
}

impl KindQuery {
    /// Kinds to try, in priority order.
    pub fn candidates(&self) -> Vec<EntityKind> {
        match self {
            KindQuery::Auto => EntityKind::AUTO_ORDER.to_vec(),
            KindQuery::Exact(kind) => vec![*kind],
        }
    }
}

impl FromStr for KindQuery {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_lowercase().as_str() {
            "auto" => return Ok(KindQuery::Auto),
            "function" | "fn" | "method" => EntityKind::Function,
            "class" => EntityKind::Class,
            "struct" => EntityKind::Struct,
            "enum" => EntityKind::Enum,
            "interface" | "trait" => EntityKind::Interface,
            "impl" => EntityKind::Impl,
            _ => return Err(HistoryError::InvalidKind(s.to_string())),
        };
        Ok(KindQuery::Exact(kind))
    }
}

impl fmt::Display for KindQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindQuery::Auto => f.pad("auto"),
            KindQuery::Exact(kind) => kind.fmt(f),
        }
    }
}

/// Where an entity lives in one revision of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub name: String,
    pub kind: EntityKind,
    /// First line (1-indexed, inclusive)
    pub start_line: u32,
    /// Last line (1-indexed, inclusive)
    pub end_line: u32,
    /// One-line, human readable declaration
    pub signature: String,
    /// Enclosing class/impl/struct, for methods
    pub parent: Option<String>,
}

impl EntitySpan {
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Source text of the span within `source`.
    pub fn extract<'a>(&self, source: &'a str) -> String {
        source
            .lines()
            .skip(self.start_line.saturating_sub(1) as usize)
            .take(self.line_count() as usize)
            .collect::<Vec<&'a str>>()
            .join("\n")
    }
}

/// What happened to an entity in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        })
    }
}

/// One entry of an entity timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    pub commit: CommitRecord,
    /// Span after the commit; `None` for deletions
    pub span: Option<EntitySpan>,
    pub change: ChangeKind,
}

/// Full timeline of one entity in one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory {
    pub name: String,
    pub file_path: String,
    pub repository: String,
    pub language: Option<String>,
    /// Newest first
    pub changes: Vec<EntityChange>,
    pub first_appeared: Option<CommitRecord>,
    pub last_modified: Option<CommitRecord>,
    pub total_changes: usize,
    /// Span at HEAD; `None` if the entity is gone
    pub current: Option<EntitySpan>,
}

impl EntityHistory {
    /// Timeline with no recorded changes.
    pub fn empty(
        name: &str,
        file_path: &str,
        repository: String,
        language: Option<String>,
        current: Option<EntitySpan>,
    ) -> Self {
        Self {
            name: name.to_string(),
            file_path: file_path.to_string(),
            repository,
            language,
            changes: Vec::new(),
            first_appeared: None,
            last_modified: None,
            total_changes: 0,
            current,
        }
    }
}

/// One step in a line's provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub commit: CommitRecord,
    /// Line content after this commit
    pub content: String,
}

/// Blame attribution for one line, as produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    /// 1-indexed
    pub line_number: u32,
    pub content: String,
    pub commit: CommitRecord,
}

/// A current line of an entity with its full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedLine {
    pub line_number: u32,
    pub content: String,
    /// Oldest first; never empty
    pub history: Vec<LineChange>,
    pub blame_commit: CommitRecord,
}

/// An entity at HEAD with per-line provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedEntity {
    pub name: String,
    pub file_path: String,
    pub repository: String,
    pub language: Option<String>,
    pub span: EntitySpan,
    pub lines: Vec<AnnotatedLine>,
    /// Distinct commits across all line histories
    pub total_commits: usize,
    pub created_at: Option<CommitRecord>,
}

/// The entity source at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub commit: CommitRecord,
    /// `None` when the entity was deleted
    pub source: Option<String>,
    pub span: Option<EntitySpan>,
    pub change: ChangeKind,
}

/// Text-level evolution of an entity, oldest snapshot first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvolution {
    pub name: String,
    pub file_path: String,
    pub kind: EntityKind,
    pub snapshots: Vec<EntitySnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_commit_record_derives_subject_and_short_hash() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let commit = CommitRecord::new(
            "0123456789abcdef",
            "Ada",
            "ada@example.com",
            ts,
            "  Fix parser  \n\nLonger body",
            7,
        );
        assert_eq!(commit.short_hash, "0123456");
        assert_eq!(commit.subject, "Fix parser");
    }

    #[test]
    fn test_kind_query_parsing() {
        assert_eq!("auto".parse::<KindQuery>().unwrap(), KindQuery::Auto);
        assert_eq!(
            "Struct".parse::<KindQuery>().unwrap(),
            KindQuery::Exact(EntityKind::Struct)
        );
        assert_eq!(
            "trait".parse::<KindQuery>().unwrap(),
            KindQuery::Exact(EntityKind::Interface)
        );
        assert!("module".parse::<KindQuery>().is_err());
    }

    #[test]
    fn test_span_extract() {
        let span = EntitySpan {
            name: "b".into(),
            kind: EntityKind::Function,
            start_line: 2,
            end_line: 3,
            signature: "def b()".into(),
            parent: None,
        };
        assert_eq!(span.extract("a\nb\nc\nd"), "b\nc");
        assert!(span.contains(3));
        assert!(!span.contains(4));
    }
}
