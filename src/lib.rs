//! fnhist - git history of a single code entity
//!
//! Locates a named function, class, struct, enum, interface or impl block
//! in every revision of a file and reconstructs its timeline from the
//! commits that touched the file. On top of the timeline, every current
//! line of the entity can be annotated with the commits that produced it.
//!
//! ```no_run
//! use fnhist::{EntityLocator, HistoryReconstructor, KindQuery, LocalRepository};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let repo = LocalRepository::open(Path::new("."))?;
//! let locator = EntityLocator::default();
//! let history = HistoryReconstructor::new(&repo, &locator).reconstruct_entity_history(
//!     "src/app.py",
//!     "handle_request",
//!     KindQuery::Auto,
//! )?;
//! for change in &history.changes {
//!     println!("{} {}", change.commit.short_hash, change.change);
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotate;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod history;
pub mod locator;
pub mod models;
pub mod reporters;

pub use annotate::LineProvenanceAssembler;
pub use config::{FnhistConfig, Language, LanguageTable};
pub use diff::{overlaps, parse_hunks, DiffHunk};
pub use error::{HistoryError, Result};
pub use git::{GitBackend, GithubRepository, LocalRepository};
pub use history::HistoryReconstructor;
pub use locator::EntityLocator;
pub use models::{
    AnnotatedEntity, AnnotatedLine, BlameLine, ChangeKind, CommitRecord, EntityChange,
    EntityEvolution, EntityHistory, EntityKind, EntitySnapshot, EntitySpan, KindQuery,
    LineChange,
};
