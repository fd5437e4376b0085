//! Configuration for fnhist
//!
//! Supports loading config from:
//! - ~/.config/fnhist/config.toml
//! - .fnhist.toml in the repository root
//! - Environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::languages::LanguageTable;

pub const DEFAULT_CONTEXT_LINES: u32 = 3;
pub const DEFAULT_SHORT_HASH_LEN: usize = 7;
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const PROJECT_CONFIG_FILE: &str = ".fnhist.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FnhistConfig {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub github: GithubConfig,

    /// Extra extension -> language mappings, e.g. `pyw = "python"`
    #[serde(default)]
    pub languages: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Only walk the newest N commits touching the file
    pub max_commits: Option<usize>,

    /// Context lines in generated diffs (default: 3)
    pub context_lines: Option<u32>,

    /// Length of abbreviated commit hashes (default: 7)
    pub short_hash_len: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GithubConfig {
    /// Personal access token; needed for blame
    pub token: Option<String>,

    /// API base URL (default: https://api.github.com)
    pub api_url: Option<String>,
}

impl FnhistConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. Project config (`.fnhist.toml` in `repo_root`)
    /// 3. User config (~/.config/fnhist/config.toml)
    pub fn load(repo_root: Option<&Path>) -> Result<Self> {
        let mut config = FnhistConfig::default();

        if let Some(user) = Self::user_config_path()
            .filter(|p| p.exists())
            .and_then(|p| read_config_file(&p))
        {
            config.merge(user);
        }

        if let Some(project) = repo_root
            .map(|root| root.join(PROJECT_CONFIG_FILE))
            .filter(|p| p.exists())
            .and_then(|p| read_config_file(&p))
        {
            config.merge(project);
        }

        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                config.github.token = Some(token);
            }
        }
        if let Ok(raw) = std::env::var("FNHIST_MAX_COMMITS") {
            let max = raw
                .parse::<usize>()
                .with_context(|| format!("FNHIST_MAX_COMMITS must be a number, got '{}'", raw))?;
            config.history.max_commits = Some(max);
        }

        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fnhist").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: FnhistConfig) {
        if other.history.max_commits.is_some() {
            self.history.max_commits = other.history.max_commits;
        }
        if other.history.context_lines.is_some() {
            self.history.context_lines = other.history.context_lines;
        }
        if other.history.short_hash_len.is_some() {
            self.history.short_hash_len = other.history.short_hash_len;
        }
        if other.github.token.is_some() {
            self.github.token = other.github.token;
        }
        if other.github.api_url.is_some() {
            self.github.api_url = other.github.api_url;
        }
        self.languages.extend(other.languages);
    }

    pub fn max_commits(&self) -> Option<usize> {
        self.history.max_commits
    }

    pub fn context_lines(&self) -> u32 {
        self.history.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES)
    }

    pub fn short_hash_len(&self) -> usize {
        self.history
            .short_hash_len
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SHORT_HASH_LEN)
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref()
    }

    pub fn github_api_url(&self) -> &str {
        self.github
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API_URL)
    }

    /// The immutable extension table for this configuration.
    pub fn language_table(&self) -> LanguageTable {
        LanguageTable::with_overrides(&self.languages)
    }

    /// Create the user config directory and an example config file.
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        if !config_path.exists() {
            let example = r#"# fnhist configuration

[history]
# Only walk the newest N commits that touched the file
# max_commits = 200
# context_lines = 3
# short_hash_len = 7

[github]
# Needed for blame (annotate) on GitHub repositories; GITHUB_TOKEN also works
# token = "ghp_..."
# api_url = "https://api.github.com"

[languages]
# Map extra file extensions onto a supported language
# pyw = "python"
# hh = "cpp"
"#;
            std::fs::write(&config_path, example)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
        }

        Ok(config_path)
    }
}

/// Read one TOML config file; unreadable or invalid files are skipped.
fn read_config_file(path: &Path) -> Option<FnhistConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match toml::from_str::<FnhistConfig>(&content) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = FnhistConfig::default();
        assert_eq!(config.context_lines(), 3);
        assert_eq!(config.short_hash_len(), 7);
        assert_eq!(config.github_api_url(), "https://api.github.com");
        assert!(config.max_commits().is_none());
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
[history]
max_commits = 50
short_hash_len = 10

[languages]
pyw = "python"
"#;
        let config: FnhistConfig = toml::from_str(content).unwrap();
        assert_eq!(config.max_commits(), Some(50));
        assert_eq!(config.short_hash_len(), 10);
        assert_eq!(config.context_lines(), 3);
        assert!(config.language_table().detect("x.pyw").is_some());
    }

    #[test]
    fn test_project_config_overrides_user_values() {
        let mut base: FnhistConfig = toml::from_str("[history]\nmax_commits = 10\ncontext_lines = 5\n").unwrap();
        let project: FnhistConfig = toml::from_str("[history]\nmax_commits = 20\n").unwrap();
        base.merge(project);
        assert_eq!(base.max_commits(), Some(20));
        assert_eq!(base.context_lines(), 5);
    }

    #[test]
    fn test_read_invalid_file_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "[history\nbroken")?;
        assert!(read_config_file(&path).is_none());
        Ok(())
    }
}
