//! Entity-level history reconstruction
//!
//! Walks the commits that touched a file, oldest to newest, locating the
//! entity in every revision. The walk is a small state machine over the
//! span found in the previous revision:
//!
//! | before  | after   | emitted                                  |
//! |---------|---------|------------------------------------------|
//! | absent  | present | `created`                                |
//! | present | present | `modified`, if a hunk overlaps the span  |
//! | present | absent  | `deleted`                                |
//! | absent  | absent  | nothing                                  |
//!
//! Missing file content and unparsable revisions both count as absent.

mod evolution;

#[cfg(test)]
mod tests;

use tracing::{debug, info};

use crate::config::Language;
use crate::diff::{any_touches, parse_hunks};
use crate::error::Result;
use crate::git::GitBackend;
use crate::locator::EntityLocator;
use crate::models::{ChangeKind, CommitRecord, EntityChange, EntityHistory, EntitySpan, KindQuery};

/// A touching commit paired with the file content it left behind.
pub(crate) type Revision = (CommitRecord, Option<String>);

/// Rebuilds the timeline of a single entity from a [`GitBackend`].
pub struct HistoryReconstructor<'a, B: GitBackend + ?Sized> {
    backend: &'a B,
    locator: &'a EntityLocator,
    max_commits: Option<usize>,
}

impl<'a, B: GitBackend + ?Sized> HistoryReconstructor<'a, B> {
    pub fn new(backend: &'a B, locator: &'a EntityLocator) -> Self {
        Self {
            backend,
            locator,
            max_commits: None,
        }
    }

    /// Only walk the newest `max_commits` touching commits.
    pub fn with_max_commits(mut self, max_commits: Option<usize>) -> Self {
        self.max_commits = max_commits;
        self
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub fn locator(&self) -> &'a EntityLocator {
        self.locator
    }

    /// Timeline of `name` in `file_path`, newest change first.
    ///
    /// An entity that never existed yields an empty timeline, not an error.
    /// Backend failures are propagated.
    pub fn reconstruct_entity_history(
        &self,
        file_path: &str,
        name: &str,
        kind: KindQuery,
    ) -> Result<EntityHistory> {
        let repository = self.backend.repository_id();
        let Some(language) = self.locator.detect_language(file_path) else {
            debug!("No language for {}, nothing to track", file_path);
            return Ok(EntityHistory::empty(name, file_path, repository, None, None));
        };

        let current = self.current_span(file_path, name, kind, language)?;
        let revisions = self.load_revisions(file_path)?;
        let kind = self.resolve_kind(kind, current.as_ref(), &revisions, name, language);

        let mut changes: Vec<EntityChange> = Vec::new();
        let mut state: Option<EntitySpan> = None;

        for (commit, content) in &revisions {
            let found = content
                .as_deref()
                .and_then(|source| self.locator.locate(source, name, kind, language));

            match (state.take(), found) {
                (None, Some(span)) => {
                    debug!(
                        "{} created in {} at {}-{}",
                        name, commit.short_hash, span.start_line, span.end_line
                    );
                    changes.push(EntityChange {
                        commit: commit.clone(),
                        span: Some(span.clone()),
                        change: ChangeKind::Created,
                    });
                    state = Some(span);
                }
                (Some(_), Some(span)) => {
                    let hunks = parse_hunks(&self.backend.diff_for(&commit.hash, file_path)?);
                    if any_touches(&hunks, &span) {
                        debug!("{} modified in {}", name, commit.short_hash);
                        changes.push(EntityChange {
                            commit: commit.clone(),
                            span: Some(span.clone()),
                            change: ChangeKind::Modified,
                        });
                    }
                    state = Some(span);
                }
                (Some(_), None) => {
                    debug!("{} deleted in {}", name, commit.short_hash);
                    changes.push(EntityChange {
                        commit: commit.clone(),
                        span: None,
                        change: ChangeKind::Deleted,
                    });
                }
                (None, None) => {}
            }
        }

        changes.reverse();

        let mut history = EntityHistory::empty(
            name,
            file_path,
            repository,
            Some(language.as_str().to_string()),
            current,
        );
        history.first_appeared = changes.last().map(|c| c.commit.clone());
        history.last_modified = changes.first().map(|c| c.commit.clone());
        history.total_changes = changes.len();
        history.changes = changes;

        info!(
            "{} changes to {} across {} commits",
            history.total_changes,
            name,
            revisions.len()
        );
        Ok(history)
    }

    /// The entity as it stands at the backend's head revision.
    pub fn current_span(
        &self,
        file_path: &str,
        name: &str,
        kind: KindQuery,
        language: Language,
    ) -> Result<Option<EntitySpan>> {
        let head = self.backend.head();
        Ok(self
            .backend
            .file_content_at(&head, file_path)?
            .and_then(|source| self.locator.locate(&source, name, kind, language)))
    }

    /// Touching commits to walk, oldest first, capped to the newest
    /// `max_commits`.
    pub(crate) fn touching_commits(&self, file_path: &str) -> Result<Vec<CommitRecord>> {
        let mut commits = self.backend.list_commits_touching(file_path)?;
        if let Some(max) = self.max_commits {
            if commits.len() > max {
                debug!("Capping walk to the newest {} of {} commits", max, commits.len());
                commits.truncate(max);
            }
        }
        commits.reverse();
        Ok(commits)
    }

    /// Touching commits with the file content each left behind.
    fn load_revisions(&self, file_path: &str) -> Result<Vec<Revision>> {
        let commits = self.touching_commits(file_path)?;
        info!("Walking {} commits touching {}", commits.len(), file_path);
        commits
            .into_iter()
            .map(|commit| -> Result<Revision> {
                let content = self.backend.file_content_at(&commit.hash, file_path)?;
                if content.is_none() {
                    debug!("{} has no readable {}", commit.short_hash, file_path);
                }
                Ok((commit, content))
            })
            .collect()
    }

    /// Pin an auto query to the kind found at HEAD, or else in the newest
    /// revision containing the entity. Stays auto if neither has it.
    fn resolve_kind(
        &self,
        kind: KindQuery,
        current: Option<&EntitySpan>,
        revisions: &[Revision],
        name: &str,
        language: Language,
    ) -> KindQuery {
        if let KindQuery::Exact(_) = kind {
            return kind;
        }
        if let Some(span) = current {
            return KindQuery::Exact(span.kind);
        }
        revisions
            .iter()
            .rev()
            .find_map(|(_, content)| {
                let source = content.as_deref()?;
                self.locator.locate(source, name, kind, language)
            })
            .map(|span| {
                debug!("Pinned {} to {} from history", name, span.kind);
                KindQuery::Exact(span.kind)
            })
            .unwrap_or(KindQuery::Auto)
    }
}
