//! Local repository access using libgit2
//!
//! Walks history, reads blobs, renders per-file patches and blames line
//! ranges with the git2 crate.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use git2::{BlameOptions, DiffFormat, DiffOptions, ErrorCode, Oid, Repository, Sort, Tree};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::GitBackend;
use crate::config::{DEFAULT_CONTEXT_LINES, DEFAULT_SHORT_HASH_LEN};
use crate::models::{BlameLine, CommitRecord};

/// A git repository on disk.
pub struct LocalRepository {
    repo: Repository,
    context_lines: u32,
    short_hash_len: usize,
}

impl LocalRepository {
    /// Open the repository containing `path` (or any subdirectory of it).
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to open git repository at {:?}", path))?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self {
            repo,
            context_lines: DEFAULT_CONTEXT_LINES,
            short_hash_len: DEFAULT_SHORT_HASH_LEN,
        })
    }

    /// Set diff context and abbreviated hash length.
    pub fn with_options(mut self, context_lines: u32, short_hash_len: usize) -> Self {
        self.context_lines = context_lines;
        self.short_hash_len = short_hash_len;
        self
    }

    /// Check if a path is inside a git repository.
    pub fn is_git_repo(path: &Path) -> bool {
        Repository::discover(path).is_ok()
    }

    /// Get the repository root path.
    pub fn repo_root(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory (bare repo?)")
    }

    /// Turn a user-supplied path into a repo-relative one with `/` separators.
    pub fn relative_path(&self, file_path: &Path) -> String {
        let relative = match self.repo.workdir() {
            Some(root) if file_path.is_absolute() => {
                let canonical_root = root.canonicalize().ok();
                file_path
                    .strip_prefix(root)
                    .ok()
                    .or_else(|| {
                        canonical_root
                            .as_deref()
                            .and_then(|r| file_path.strip_prefix(r).ok())
                    })
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| file_path.to_path_buf())
            }
            _ => file_path.to_path_buf(),
        };
        relative
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches("./")
            .to_string()
    }

    fn commit_record(&self, commit: &git2::Commit) -> CommitRecord {
        let author = commit.author();
        CommitRecord::new(
            commit.id().to_string(),
            author.name().unwrap_or("Unknown"),
            author.email().unwrap_or(""),
            git_time(&commit.time()),
            commit.message().unwrap_or(""),
            self.short_hash_len,
        )
    }

    fn resolve_commit(&self, revision: &str) -> Result<git2::Commit<'_>> {
        self.repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Failed to resolve revision {}", revision))
    }
}

impl GitBackend for LocalRepository {
    fn repository_id(&self) -> String {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .display()
            .to_string()
    }

    fn list_commits_touching(&self, file_path: &str) -> Result<Vec<CommitRecord>> {
        if self.repo.head().is_err() {
            debug!("Repository has no HEAD yet");
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_head()?;

        let path = Path::new(file_path);
        let mut commits = Vec::new();

        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            let entry = entry_id(&commit.tree()?, path);

            // Like `git log -- path`: skip commits whose file matches any parent
            let touched = if commit.parent_count() == 0 {
                entry.is_some()
            } else {
                let mut touched = true;
                for parent in commit.parents() {
                    if entry_id(&parent.tree()?, path) == entry {
                        touched = false;
                        break;
                    }
                }
                touched
            };

            if touched {
                commits.push(self.commit_record(&commit));
            }
        }

        debug!("{} commits touch {}", commits.len(), file_path);
        Ok(commits)
    }

    fn file_content_at(&self, revision: &str, file_path: &str) -> Result<Option<String>> {
        let commit = match self.repo.revparse_single(revision) {
            Ok(obj) => obj.peel_to_commit()?,
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::UnbornBranch) => {
                return Ok(None)
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to resolve revision {}", revision))
            }
        };

        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(file_path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Ok(blob) = entry.to_object(&self.repo)?.into_blob() else {
            return Ok(None);
        };
        if blob.is_binary() {
            return Ok(None);
        }
        Ok(std::str::from_utf8(blob.content()).ok().map(str::to_string))
    }

    fn diff_for(&self, revision: &str, file_path: &str) -> Result<String> {
        let commit = self.resolve_commit(revision)?;
        let tree = commit.tree()?;
        let parent = commit.parent(0).ok();
        let parent_tree = parent.as_ref().map(|p| p.tree()).transpose()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.pathspec(file_path);
        diff_opts.context_lines(self.context_lines);

        let diff = self.repo.diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&tree),
            Some(&mut diff_opts),
        )?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let content = String::from_utf8_lossy(line.content());
            match line.origin() {
                '+' | '-' | ' ' => {
                    patch.push(line.origin());
                    patch.push_str(&content);
                }
                'F' | 'H' => patch.push_str(&content),
                // end-of-file newline markers and binary notices
                _ => {}
            }
            true
        })
        .with_context(|| format!("Failed to diff {} at {}", file_path, revision))?;

        Ok(patch)
    }

    fn blame_over(
        &self,
        revision: &str,
        file_path: &str,
        start_line: u32,
        end_line: u32,
    ) -> Result<Vec<BlameLine>> {
        if start_line == 0 || end_line < start_line {
            return Ok(Vec::new());
        }

        let Some(content) = self.file_content_at(revision, file_path)? else {
            return Ok(Vec::new());
        };
        let lines: Vec<&str> = content.lines().collect();
        let end_line = end_line.min(lines.len() as u32);
        if end_line < start_line {
            return Ok(Vec::new());
        }

        let commit = self.resolve_commit(revision)?;
        let mut opts = BlameOptions::new();
        opts.newest_commit(commit.id());
        opts.min_line(start_line as usize);
        opts.max_line(end_line as usize);

        let blame = self
            .repo
            .blame_file(Path::new(file_path), Some(&mut opts))
            .with_context(|| format!("Failed to blame {}:{}-{}", file_path, start_line, end_line))?;

        let mut records: HashMap<Oid, CommitRecord> = HashMap::new();
        let mut result = Vec::new();

        for line_number in start_line..=end_line {
            let Some(hunk) = blame.get_line(line_number as usize) else {
                continue;
            };
            let oid = hunk.final_commit_id();
            let commit = match records.get(&oid) {
                Some(record) => record.clone(),
                None => {
                    let record = self.commit_record(&self.repo.find_commit(oid)?);
                    records.insert(oid, record.clone());
                    record
                }
            };
            result.push(BlameLine {
                line_number,
                content: lines[(line_number - 1) as usize].to_string(),
                commit,
            });
        }

        Ok(result)
    }
}

fn entry_id(tree: &Tree, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

fn git_time(time: &git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}
