//! Configuration module for fnhist
//!
//! This module handles:
//! - User and project configuration files (config.toml, .fnhist.toml)
//! - The file extension -> language table used by the locator

mod languages;
mod user_config;

pub use languages::{Language, LanguageTable};
pub use user_config::{
    FnhistConfig, GithubConfig, HistoryConfig, DEFAULT_CONTEXT_LINES, DEFAULT_GITHUB_API_URL,
    DEFAULT_SHORT_HASH_LEN, PROJECT_CONFIG_FILE,
};
