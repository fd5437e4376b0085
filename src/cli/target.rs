//! Resolve `--repo` and the FILE argument into a backend plus a
//! repository-relative path.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::FnhistConfig;
use crate::git::{
    is_github_url, parse_github_url, GitBackend, GithubLocation, GithubRepository,
    LocalRepository,
};
use crate::locator::EntityLocator;

/// Everything a subcommand needs to talk to one repository.
pub(crate) struct Target {
    pub backend: Box<dyn GitBackend>,
    pub file_path: String,
    pub config: FnhistConfig,
}

impl Target {
    pub fn locator(&self) -> EntityLocator {
        EntityLocator::new(self.config.language_table())
    }

    /// CLI cap wins over the configured one.
    pub fn max_commits(&self, cli: Option<usize>) -> Option<usize> {
        cli.or(self.config.max_commits())
    }
}

/// A GitHub file URL as FILE selects the GitHub backend on its own; otherwise
/// `--repo` decides.
pub(crate) fn resolve(repo: &str, file: &str) -> Result<Target> {
    if is_github_url(file) {
        let location = parse_github_url(file)?;
        let file_path = location
            .file_path
            .clone()
            .ok_or_else(|| anyhow!("GitHub URL must include a file path: {}", file))?;
        return github(&location, file_path);
    }

    if is_github_url(repo) {
        let location = parse_github_url(repo)?;
        return github(&location, file.trim_start_matches('/').to_string());
    }

    local(Path::new(repo), file)
}

fn github(location: &GithubLocation, file_path: String) -> Result<Target> {
    let config = FnhistConfig::load(None)?;
    let backend = GithubRepository::connect(
        location,
        config.github_token().map(str::to_string),
        Some(config.github_api_url()),
    )
    .with_context(|| {
        format!(
            "Failed to connect to GitHub repository {}/{}",
            location.owner, location.repo
        )
    })?
    .with_short_hash_len(config.short_hash_len());
    info!("Source: GitHub ({}/{})", location.owner, location.repo);

    Ok(Target {
        backend: Box::new(backend),
        file_path,
        config,
    })
}

fn local(repo_path: &Path, file: &str) -> Result<Target> {
    let repo = LocalRepository::open(repo_path)?;
    let config = FnhistConfig::load(Some(repo.repo_root()?))?;
    let repo = repo.with_options(config.context_lines(), config.short_hash_len());

    // A FILE that exists relative to the working directory is taken as such;
    // anything else is already relative to the repository root
    let candidate = Path::new(file);
    let file_path = if candidate.is_absolute() {
        repo.relative_path(candidate)
    } else {
        candidate
            .canonicalize()
            .ok()
            .map(|absolute| repo.relative_path(&absolute))
            .filter(|relative| !Path::new(relative).is_absolute())
            .unwrap_or_else(|| repo.relative_path(candidate))
    };
    if Path::new(&file_path).is_absolute() {
        anyhow::bail!("{} is not inside repository {}", file, repo.repository_id());
    }
    info!("Source: local git ({})", repo.repository_id());

    Ok(Target {
        backend: Box::new(repo),
        file_path,
        config,
    })
}
