//! GitHub repository access over HTTP
//!
//! Uses the REST API for commit listings, file contents and per-commit
//! patches, and the GraphQL API for blame (which needs a token). Sync HTTP
//! via ureq; no async runtime.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::GitBackend;
use crate::config::{DEFAULT_GITHUB_API_URL, DEFAULT_SHORT_HASH_LEN};
use crate::models::{BlameLine, CommitRecord};

const PER_PAGE: usize = 100;
const USER_AGENT: &str = "fnhist";

/// Owner/repo and optional branch and file taken from a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubLocation {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub file_path: Option<String>,
}

/// Whether `spec` looks like a GitHub URL rather than a local path.
pub fn is_github_url(spec: &str) -> bool {
    let rest = spec
        .strip_prefix("https://")
        .or_else(|| spec.strip_prefix("http://"))
        .unwrap_or(spec);
    rest.starts_with("github.com/") || rest.starts_with("www.github.com/")
}

/// Parse URLs of the forms:
/// - `https://github.com/owner/repo`
/// - `https://github.com/owner/repo/tree/branch`
/// - `https://github.com/owner/repo/blob/branch/path/to/file.rs`
/// - `github.com/owner/repo`
pub fn parse_github_url(url: &str) -> Result<GithubLocation> {
    let rest = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let rest = rest.strip_prefix("github.com/").unwrap_or(rest);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 {
        bail!("Invalid GitHub URL: {}", url);
    }

    let owner = parts[0].to_string();
    let repo = parts[1].trim_end_matches(".git").to_string();

    let (branch, file_path) = if parts.len() >= 4 && matches!(parts[2], "tree" | "blob") {
        let file = (parts.len() > 4).then(|| parts[4..].join("/"));
        (Some(parts[3].to_string()), file)
    } else {
        (None, None)
    };

    Ok(GithubLocation {
        owner,
        repo,
        branch,
        file_path,
    })
}

/// A repository read through the GitHub API.
pub struct GithubRepository {
    owner: String,
    repo: String,
    branch: String,
    api_url: String,
    token: Option<String>,
    short_hash_len: usize,
    agent: ureq::Agent,
    /// (revision, path) -> patch; history and annotate both replay diffs
    patches: RefCell<HashMap<(String, String), String>>,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(30)))
        .build()
        .new_agent()
}

impl GithubRepository {
    /// Connect to the repository at `location`, resolving its default
    /// branch when the URL does not name one.
    pub fn connect(
        location: &GithubLocation,
        token: Option<String>,
        api_url: Option<&str>,
    ) -> Result<Self> {
        let mut repo = Self {
            owner: location.owner.clone(),
            repo: location.repo.clone(),
            branch: location.branch.clone().unwrap_or_default(),
            api_url: api_url
                .unwrap_or(DEFAULT_GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token,
            short_hash_len: DEFAULT_SHORT_HASH_LEN,
            agent: make_agent(),
            patches: RefCell::new(HashMap::new()),
        };
        if repo.branch.is_empty() {
            repo.branch = repo.default_branch()?;
        }
        debug!(
            "Using GitHub repository {}/{} at {}",
            repo.owner, repo.repo, repo.branch
        );
        Ok(repo)
    }

    pub fn with_short_hash_len(mut self, short_hash_len: usize) -> Self {
        self.short_hash_len = short_hash_len;
        self
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url, self.owner, self.repo, suffix
        )
    }

    fn get(&self, url: &str, accept: &str) -> ureq::RequestBuilder<ureq::typestate::WithoutBody> {
        let req = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => req.header("Authorization", &format!("Bearer {}", token)),
            None => req,
        }
    }

    fn default_branch(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct RepoInfo {
            default_branch: String,
        }

        let url = self.repo_url("");
        let response = self
            .get(&url, "application/vnd.github+json")
            .call()
            .with_context(|| format!("GitHub request failed: {}", url))?;
        let info: RepoInfo = read_json(response, &url)?;
        Ok(info.default_branch)
    }

    fn to_record(&self, commit: ApiCommit) -> CommitRecord {
        let author = commit.commit.author.unwrap_or_default();
        CommitRecord::new(
            commit.sha,
            author.name.unwrap_or_else(|| "Unknown".to_string()),
            author.email.unwrap_or_default(),
            author.date.unwrap_or_default(),
            commit.commit.message,
            self.short_hash_len,
        )
    }

    fn graphql_url(&self) -> String {
        match self.api_url.strip_suffix("/api/v3") {
            // GitHub Enterprise serves GraphQL at /api/graphql
            Some(base) => format!("{}/api/graphql", base),
            None => format!("{}/graphql", self.api_url),
        }
    }
}

impl GitBackend for GithubRepository {
    fn repository_id(&self) -> String {
        format!("github.com/{}/{}", self.owner, self.repo)
    }

    fn head(&self) -> String {
        self.branch.clone()
    }

    fn list_commits_touching(&self, file_path: &str) -> Result<Vec<CommitRecord>> {
        let url = self.repo_url("/commits");
        let mut commits = Vec::new();

        for page in 1.. {
            let result = self
                .get(&url, "application/vnd.github+json")
                .query("sha", &self.branch)
                .query("path", file_path)
                .query("per_page", PER_PAGE.to_string())
                .query("page", page.to_string())
                .call()
                .with_context(|| format!("GitHub request failed: {}", url))
                .and_then(|response| read_json::<Vec<ApiCommit>>(response, &url));

            let batch = match result {
                Ok(batch) => batch,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!("Failed to fetch some commits from GitHub: {:#}", e);
                    break;
                }
            };

            let done = batch.len() < PER_PAGE;
            commits.extend(batch.into_iter().map(|c| self.to_record(c)));
            if done {
                break;
            }
        }

        debug!("{} commits touch {}", commits.len(), file_path);
        Ok(commits)
    }

    fn file_content_at(&self, revision: &str, file_path: &str) -> Result<Option<String>> {
        let url = self.repo_url(&format!("/contents/{}", encode_path(file_path)));
        let response = self
            .get(&url, "application/vnd.github.raw+json")
            .query("ref", revision)
            .call()
            .with_context(|| format!("GitHub request failed: {}", url))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if status >= 400 {
            let body = response.into_body().read_to_string().unwrap_or_default();
            bail!("GitHub API error ({}) for {}: {}", status, url, body);
        }

        // Binary or non-UTF-8 content
        Ok(response.into_body().read_to_string().ok())
    }

    fn diff_for(&self, revision: &str, file_path: &str) -> Result<String> {
        let key = (revision.to_string(), file_path.to_string());
        if let Some(patch) = self.patches.borrow().get(&key) {
            return Ok(patch.clone());
        }

        let url = self.repo_url(&format!("/commits/{}", revision));
        let response = self
            .get(&url, "application/vnd.github+json")
            .call()
            .with_context(|| format!("GitHub request failed: {}", url))?;
        let detail: CommitDetail = read_json(response, &url)?;

        // Binary and very large files come without a patch
        let patch = detail
            .files
            .into_iter()
            .find(|f| f.filename == file_path)
            .and_then(|f| f.patch)
            .unwrap_or_default();

        self.patches.borrow_mut().insert(key, patch.clone());
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
        if self.token.is_none() {
            bail!("GitHub blame requires a token (set GITHUB_TOKEN or [github] token)");
        }

        let Some(content) = self.file_content_at(revision, file_path)? else {
            return Ok(Vec::new());
        };
        let lines: Vec<&str> = content.lines().collect();

        let query = r#"
            query($owner: String!, $name: String!, $expr: String!, $path: String!) {
              repository(owner: $owner, name: $name) {
                object(expression: $expr) {
                  ... on Commit {
                    blame(path: $path) {
                      ranges {
                        startingLine
                        endingLine
                        commit { oid message author { name email date } }
                      }
                    }
                  }
                }
              }
            }
        "#;

        let url = self.graphql_url();
        let mut req = self
            .agent
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", &format!("Bearer {}", token));
        }
        let response = req
            .send_json(json!({
                "query": query,
                "variables": {
                    "owner": self.owner,
                    "name": self.repo,
                    "expr": revision,
                    "path": file_path,
                }
            }))
            .with_context(|| format!("GitHub request failed: {}", url))?;
        let body: BlameResponse = read_json(response, &url)?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            bail!("GitHub blame failed: {}", messages.join("; "));
        }
        let ranges = body
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.object)
            .and_then(|o| o.blame)
            .map(|b| b.ranges)
            .unwrap_or_default();

        let end_line = end_line.min(lines.len() as u32);
        let mut result = Vec::new();
        for line_number in start_line..=end_line {
            let Some(range) = ranges
                .iter()
                .find(|r| r.starting_line <= line_number && line_number <= r.ending_line)
            else {
                continue;
            };
            let author = range.commit.author.clone().unwrap_or_default();
            result.push(BlameLine {
                line_number,
                content: lines[(line_number - 1) as usize].to_string(),
                commit: CommitRecord::new(
                    range.commit.oid.clone(),
                    author.name.unwrap_or_else(|| "Unknown".to_string()),
                    author.email.unwrap_or_default(),
                    author.date.unwrap_or_default(),
                    range.commit.message.clone(),
                    self.short_hash_len,
                ),
            });
        }
        Ok(result)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    response: ureq::http::Response<ureq::Body>,
    url: &str,
) -> Result<T> {
    let status = response.status().as_u16();
    if status >= 400 {
        let body = response.into_body().read_to_string().unwrap_or_default();
        if status == 403 || status == 429 {
            bail!(
                "GitHub rate limit or permission error ({}) for {}. Set GITHUB_TOKEN for higher limits.",
                status,
                url
            );
        }
        bail!("GitHub API error ({}) for {}: {}", status, url, body);
    }
    response
        .into_body()
        .read_json()
        .with_context(|| format!("Failed to parse GitHub response from {}", url))
}

/// Percent-encode a repository path, keeping `/` separators.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// REST payloads

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitBody,
}

#[derive(Debug, Deserialize)]
struct ApiCommitBody {
    message: String,
    author: Option<ApiAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiAuthor {
    name: Option<String>,
    email: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    patch: Option<String>,
}

// GraphQL payloads

#[derive(Debug, Deserialize)]
struct BlameResponse {
    data: Option<BlameData>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlameData {
    repository: Option<BlameRepository>,
}

#[derive(Debug, Deserialize)]
struct BlameRepository {
    object: Option<BlameObject>,
}

#[derive(Debug, Deserialize)]
struct BlameObject {
    blame: Option<Blame>,
}

#[derive(Debug, Deserialize)]
struct Blame {
    ranges: Vec<BlameRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlameRange {
    starting_line: u32,
    ending_line: u32,
    commit: BlameCommit,
}

#[derive(Debug, Deserialize)]
struct BlameCommit {
    oid: String,
    message: String,
    author: Option<ApiAuthor>,
}
