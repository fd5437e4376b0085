//! Entity location
//!
//! Finds the line span of a named declaration inside one revision of a
//! source file. Each language gets an ordered list of strategies:
//!
//! - `Precise`: full parse with tree-sitter-python; a syntax error means
//!   not found for that revision
//! - `Broad`: tree-sitter declaration table for brace languages
//! - `Heuristic`: line regexes plus a brace/indent end scanner
//!
//! The first strategy that finds the entity wins. Lookups never fail; an
//! unknown language, empty source or missing name all come back as `None`.
//!
//! When two entities share a name the first one in [`EntityKind::AUTO_ORDER`]
//! wins, and within a kind the shallowest declaration (then the earliest)
//! is taken. No scope resolution is attempted.

pub mod grammar;
pub mod heuristic;
pub mod python;

use tracing::trace;

use crate::config::{Language, LanguageTable};
use crate::models::{EntityKind, EntitySpan, KindQuery};

/// Result of one strategy for one kind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lookup {
    Found(EntitySpan),
    Missing,
    /// The source does not parse; no later strategy is consulted
    Unparsable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Precise,
    Broad,
    Heuristic,
}

impl Strategy {
    /// Strategy cascade for a language.
    pub fn cascade(language: Language) -> &'static [Strategy] {
        match language {
            Language::Python => &[Strategy::Precise, Strategy::Heuristic],
            Language::Ruby => &[Strategy::Heuristic],
            _ => &[Strategy::Broad, Strategy::Heuristic],
        }
    }

    fn lookup(&self, source: &str, name: &str, kind: EntityKind, language: Language) -> Lookup {
        match self {
            Strategy::Precise => python::locate(source, name, kind),
            Strategy::Broad => grammar::locate(source, name, kind, language),
            Strategy::Heuristic => match heuristic::locate(source, name, kind, language) {
                Some(span) => Lookup::Found(span),
                None => Lookup::Missing,
            },
        }
    }
}

/// Locates entities using an immutable language table.
#[derive(Debug, Clone, Default)]
pub struct EntityLocator {
    languages: LanguageTable,
}

impl EntityLocator {
    pub fn new(languages: LanguageTable) -> Self {
        Self { languages }
    }

    pub fn detect_language(&self, file_path: &str) -> Option<Language> {
        self.languages.detect(file_path)
    }

    /// Locate `name` in `source`.
    pub fn locate(
        &self,
        source: &str,
        name: &str,
        kind: KindQuery,
        language: Language,
    ) -> Option<EntitySpan> {
        if source.trim().is_empty() || name.is_empty() {
            return None;
        }

        let kinds = kind.candidates();
        for strategy in Strategy::cascade(language) {
            for kind in &kinds {
                match strategy.lookup(source, name, *kind, language) {
                    Lookup::Found(span) => {
                        trace!(
                            "{:?} located {} {} at {}-{}",
                            strategy,
                            kind,
                            name,
                            span.start_line,
                            span.end_line
                        );
                        return Some(span);
                    }
                    Lookup::Missing => {}
                    Lookup::Unparsable => {
                        trace!("{:?}: source does not parse, {} not found", strategy, name);
                        return None;
                    }
                }
            }
        }
        None
    }

    /// Every entity the first working strategy can see, in file order.
    pub fn list(&self, source: &str, language: Language) -> Vec<EntitySpan> {
        if source.trim().is_empty() {
            return Vec::new();
        }
        let mut spans = match language {
            Language::Python => python::list(source).unwrap_or_default(),
            Language::Ruby => heuristic::list(source, language),
            _ => {
                let found = grammar::list(source, language);
                if found.is_empty() {
                    heuristic::list(source, language)
                } else {
                    found
                }
            }
        };
        spans.sort_by_key(|s| (s.start_line, s.end_line));
        spans
    }
}

/// Collapse runs of whitespace to single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
