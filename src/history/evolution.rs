//! Snapshot timeline: the entity's source text at each revision where it
//! changed.
//!
//! Unlike the canonical timeline, a change here is any difference in the
//! extracted text, so edits that only move the entity still show up.

use tracing::debug;

use super::HistoryReconstructor;
use crate::error::{HistoryError, Result};
use crate::git::GitBackend;
use crate::models::{ChangeKind, EntityEvolution, EntityKind, EntitySnapshot, KindQuery};

impl<'a, B: GitBackend + ?Sized> HistoryReconstructor<'a, B> {
    /// Snapshots of `name`, oldest first.
    ///
    /// Fails with [`HistoryError::NoHistory`] when no revision ever
    /// contained the entity.
    pub fn entity_evolution(
        &self,
        file_path: &str,
        name: &str,
        kind: KindQuery,
    ) -> Result<EntityEvolution> {
        let language = self
            .locator
            .detect_language(file_path)
            .ok_or_else(|| HistoryError::UnsupportedLanguage(file_path.to_string()))?;

        let current = self.current_span(file_path, name, kind, language)?;
        let revisions = self.load_revisions(file_path)?;
        let query = self.resolve_kind(kind, current.as_ref(), &revisions, name, language);

        let mut snapshots = Vec::new();
        let mut previous: Option<String> = None;

        for (commit, content) in revisions {
            let found = content.as_deref().and_then(|source| {
                self.locator
                    .locate(source, name, query, language)
                    .map(|span| {
                        let text = span.extract(source);
                        (span, text)
                    })
            });

            let change = match (&previous, &found) {
                (None, Some(_)) => Some(ChangeKind::Created),
                (Some(old), Some((_, text))) if old != text => Some(ChangeKind::Modified),
                (Some(_), None) => Some(ChangeKind::Deleted),
                _ => None,
            };

            match found {
                Some((span, text)) => {
                    if let Some(change) = change {
                        debug!("{} {} in {}", name, change, commit.short_hash);
                        snapshots.push(EntitySnapshot {
                            commit,
                            source: Some(text.clone()),
                            span: Some(span),
                            change,
                        });
                    }
                    previous = Some(text);
                }
                None => {
                    if change.is_some() {
                        debug!("{} deleted in {}", name, commit.short_hash);
                        snapshots.push(EntitySnapshot {
                            commit,
                            source: None,
                            span: None,
                            change: ChangeKind::Deleted,
                        });
                    }
                    previous = None;
                }
            }
        }

        if snapshots.is_empty() {
            return Err(HistoryError::NoHistory {
                entity: name.to_string(),
                file: file_path.to_string(),
            });
        }

        let kind = match query {
            KindQuery::Exact(kind) => kind,
            KindQuery::Auto => snapshots
                .iter()
                .find_map(|s| s.span.as_ref().map(|span| span.kind))
                .unwrap_or(EntityKind::Function),
        };

        Ok(EntityEvolution {
            name: name.to_string(),
            file_path: file_path.to_string(),
            kind,
            snapshots,
        })
    }
}
