//! Repository data sources
//!
//! History reconstruction only needs four questions answered about a
//! repository; [`GitBackend`] is that seam. Two implementations ship:
//!
//! - [`LocalRepository`]: a repository on disk, read with libgit2
//! - [`GithubRepository`]: a GitHub repository, read over the REST and
//!   GraphQL APIs
//!
//! # Example
//!
//! ```no_run
//! use fnhist::git::{GitBackend, LocalRepository};
//! use std::path::Path;
//!
//! let repo = LocalRepository::open(Path::new("/path/to/repo")).unwrap();
//! let commits = repo.list_commits_touching("src/main.rs").unwrap();
//! let head = repo.file_content_at("HEAD", "src/main.rs").unwrap();
//! ```

#[cfg(test)]
pub(crate) mod fake;
pub mod github;
pub mod local;

use anyhow::Result;

use crate::models::{BlameLine, CommitRecord};

pub use github::{is_github_url, parse_github_url, GithubLocation, GithubRepository};
pub use local::LocalRepository;

/// Raw repository access used by the history reconstructor.
///
/// Implementations report a missing file as `Ok(None)`; `Err` is reserved
/// for failures of the backend itself (I/O, network, corrupt objects).
pub trait GitBackend {
    /// Human readable identity of the repository (path or `host/owner/repo`).
    fn repository_id(&self) -> String;

    /// Revision naming the latest state of the repository.
    fn head(&self) -> String {
        "HEAD".to_string()
    }

    /// Commits that changed `file_path`, newest first.
    fn list_commits_touching(&self, file_path: &str) -> Result<Vec<CommitRecord>>;

    /// File text at `revision`; `None` if absent, binary or not UTF-8.
    fn file_content_at(&self, revision: &str, file_path: &str) -> Result<Option<String>>;

    /// Unified diff of `file_path` between `revision` and its first parent
    /// (the empty tree for a root commit). Empty when the file did not change.
    fn diff_for(&self, revision: &str, file_path: &str) -> Result<String>;

    /// Blame for lines `start_line..=end_line` (1-indexed) as of `revision`.
    fn blame_over(
        &self,
        revision: &str,
        file_path: &str,
        start_line: u32,
        end_line: u32,
    ) -> Result<Vec<BlameLine>>;
}

impl<B: GitBackend + ?Sized> GitBackend for Box<B> {
    fn repository_id(&self) -> String {
        (**self).repository_id()
    }

    fn head(&self) -> String {
        (**self).head()
    }

    fn list_commits_touching(&self, file_path: &str) -> Result<Vec<CommitRecord>> {
        (**self).list_commits_touching(file_path)
    }

    fn file_content_at(&self, revision: &str, file_path: &str) -> Result<Option<String>> {
        (**self).file_content_at(revision, file_path)
    }

    fn diff_for(&self, revision: &str, file_path: &str) -> Result<String> {
        (**self).diff_for(revision, file_path)
    }

    fn blame_over(
        &self,
        revision: &str,
        file_path: &str,
        start_line: u32,
        end_line: u32,
    ) -> Result<Vec<BlameLine>> {
        (**self).blame_over(revision, file_path, start_line, end_line)
    }
}
