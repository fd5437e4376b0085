//! Output reporters for fnhist results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

use crate::models::{AnnotatedEntity, EntityEvolution, EntityHistory, EntitySpan};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Anything a subcommand can print.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Report<'a> {
    History(&'a EntityHistory),
    Annotated(&'a AnnotatedEntity),
    Evolution(&'a EntityEvolution),
    Listing {
        file_path: &'a str,
        entities: &'a [EntitySpan],
    },
}

/// Render a report in the specified format
pub fn render(report: Report<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render(report)),
        OutputFormat::Json => json::render(report),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ChangeKind, CommitRecord, EntityChange, EntityKind};
    use chrono::{TimeZone, Utc};

    pub(crate) fn commit(n: i64, subject: &str) -> CommitRecord {
        CommitRecord::new(
            format!("{:040x}", n),
            "Ada Lovelace",
            "ada@example.com",
            Utc.timestamp_opt(1_700_000_000 + n * 86_400, 0).unwrap(),
            subject,
            7,
        )
    }

    pub(crate) fn span(start: u32, end: u32) -> EntitySpan {
        EntitySpan {
            name: "foo".into(),
            kind: EntityKind::Function,
            start_line: start,
            end_line: end,
            signature: "def foo()".into(),
            parent: None,
        }
    }

    /// Created in C1, modified in C2.
    pub(crate) fn test_history() -> EntityHistory {
        let changes = vec![
            EntityChange {
                commit: commit(2, "Tweak foo"),
                span: Some(span(1, 3)),
                change: ChangeKind::Modified,
            },
            EntityChange {
                commit: commit(1, "Add foo"),
                span: Some(span(1, 3)),
                change: ChangeKind::Created,
            },
        ];
        let mut history = EntityHistory::empty(
            "foo",
            "app.py",
            "/tmp/repo".into(),
            Some("python".into()),
            Some(span(1, 3)),
        );
        history.first_appeared = Some(commit(1, "Add foo"));
        history.last_modified = Some(commit(2, "Tweak foo"));
        history.total_changes = changes.len();
        history.changes = changes;
        history
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
    }
}
