//! Per-line provenance for an entity at HEAD
//!
//! Builds on the entity timeline: the hunks of every commit that created or
//! modified the entity are replayed in order against the line numbers of
//! the current span, then merged with blame at HEAD. Replay works on raw
//! line numbers, so lines that moved since an older commit can pick up
//! entries that belonged to their old neighbours.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::diff::parse_hunks;
use crate::error::{HistoryError, Result};
use crate::git::GitBackend;
use crate::history::HistoryReconstructor;
use crate::locator::EntityLocator;
use crate::models::{
    AnnotatedEntity, AnnotatedLine, BlameLine, ChangeKind, CommitRecord, EntityHistory,
    EntitySpan, KindQuery, LineChange,
};

/// Assembles [`AnnotatedEntity`] views.
pub struct LineProvenanceAssembler<'a, B: GitBackend + ?Sized> {
    reconstructor: HistoryReconstructor<'a, B>,
}

impl<'a, B: GitBackend + ?Sized> LineProvenanceAssembler<'a, B> {
    pub fn new(backend: &'a B, locator: &'a EntityLocator) -> Self {
        Self {
            reconstructor: HistoryReconstructor::new(backend, locator),
        }
    }

    pub fn with_max_commits(mut self, max_commits: Option<usize>) -> Self {
        self.reconstructor = self.reconstructor.with_max_commits(max_commits);
        self
    }

    /// Annotate `name`, auto-detecting its kind.
    pub fn annotate_entity(
        &self,
        file_path: &str,
        name: &str,
    ) -> Result<Option<AnnotatedEntity>> {
        self.annotate_entity_as(file_path, name, KindQuery::Auto)
    }

    /// Annotate `name` as a specific kind.
    ///
    /// `Ok(None)` when the entity does not exist at HEAD. Lines without
    /// replayed changes get a single entry from blame at HEAD; only when no
    /// commit can be attributed at all is the result
    /// [`HistoryError::NoHistory`].
    pub fn annotate_entity_as(
        &self,
        file_path: &str,
        name: &str,
        kind: KindQuery,
    ) -> Result<Option<AnnotatedEntity>> {
        let locator = self.reconstructor.locator();
        if locator.detect_language(file_path).is_none() {
            return Err(HistoryError::UnsupportedLanguage(file_path.to_string()));
        }

        let history = self
            .reconstructor
            .reconstruct_entity_history(file_path, name, kind)?;
        let Some(span) = history.current.clone() else {
            debug!("{} is not present in {} at HEAD", name, file_path);
            return Ok(None);
        };

        let backend = self.reconstructor.backend();
        let head = backend.head();
        let Some(source) = backend.file_content_at(&head, file_path)? else {
            return Ok(None);
        };

        let mut replayed = self.replay(&history, &span, file_path)?;
        let blame = self.blame_by_line(&head, file_path, &span);
        // Used when neither blame nor replay has anything for a line
        let fallback = match history.changes.first() {
            Some(change) => Some(change.commit.clone()),
            None => backend.list_commits_touching(file_path)?.into_iter().next(),
        };

        let current_lines: Vec<&str> = source.lines().collect();
        let mut lines = Vec::with_capacity(span.line_count() as usize);
        for line_number in span.start_line..=span.end_line {
            let content = current_lines
                .get(line_number as usize - 1)
                .copied()
                .unwrap_or("")
                .to_string();
            let mut changes = replayed.remove(&line_number).unwrap_or_default();

            let Some(blame_commit) = blame
                .get(&line_number)
                .cloned()
                .or_else(|| changes.last().map(|c| c.commit.clone()))
                .or_else(|| fallback.clone())
            else {
                return Err(HistoryError::NoHistory {
                    entity: name.to_string(),
                    file: file_path.to_string(),
                });
            };

            if changes.last().map(|c| c.content.as_str()) != Some(content.as_str()) {
                changes.push(LineChange {
                    commit: blame_commit.clone(),
                    content: content.clone(),
                });
            }

            lines.push(AnnotatedLine {
                line_number,
                content,
                history: changes,
                blame_commit,
            });
        }

        let total_commits = lines
            .iter()
            .flat_map(|line| line.history.iter().map(|c| c.commit.hash.as_str()))
            .collect::<HashSet<_>>()
            .len();

        Ok(Some(AnnotatedEntity {
            name: name.to_string(),
            file_path: file_path.to_string(),
            repository: history.repository.clone(),
            language: history.language.clone(),
            span,
            lines,
            total_commits,
            created_at: history.first_appeared.clone(),
        }))
    }

    /// Replay the hunks of every creating or modifying commit, oldest first,
    /// onto the line numbers of `span`.
    fn replay(
        &self,
        history: &EntityHistory,
        span: &EntitySpan,
        file_path: &str,
    ) -> Result<HashMap<u32, Vec<LineChange>>> {
        let backend = self.reconstructor.backend();
        let mut replayed: HashMap<u32, Vec<LineChange>> = HashMap::new();

        for change in history.changes.iter().rev() {
            if change.change == ChangeKind::Deleted {
                continue;
            }
            let commit = &change.commit;
            for hunk in parse_hunks(&backend.diff_for(&commit.hash, file_path)?) {
                for (line_number, content) in hunk.numbered_new_lines() {
                    if !span.contains(line_number) {
                        continue;
                    }
                    let entries = replayed.entry(line_number).or_default();
                    // Context lines repeat what the line already held
                    if entries.last().is_some_and(|last| last.content == content) {
                        continue;
                    }
                    entries.push(LineChange {
                        commit: commit.clone(),
                        content: content.to_string(),
                    });
                }
            }
        }

        Ok(replayed)
    }

    /// Blame commits keyed by line number. A failing blame is logged and
    /// leaves the map empty.
    fn blame_by_line(
        &self,
        head: &str,
        file_path: &str,
        span: &EntitySpan,
    ) -> HashMap<u32, CommitRecord> {
        let backend = self.reconstructor.backend();
        match backend.blame_over(head, file_path, span.start_line, span.end_line) {
            Ok(blame) => blame
                .into_iter()
                .map(|BlameLine { line_number, commit, .. }| (line_number, commit))
                .collect(),
            Err(e) => {
                warn!("Blame unavailable for {}: {:#}", file_path, e);
                HashMap::new()
            }
        }
    }
}
