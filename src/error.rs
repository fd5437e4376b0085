//! Error types for history reconstruction.
//!
//! Entity lookups that come up empty are not errors; they surface as `None`
//! or as an empty timeline. Only the conditions below reach the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("No history found for '{entity}' in {file}")]
    NoHistory { entity: String, file: String },

    #[error("'{entity}' not found in {file} at HEAD")]
    EntityNotFound { entity: String, file: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedLanguage(String),

    #[error("Unknown entity kind '{0}'. Valid kinds: auto, function, class, struct, enum, interface, impl")]
    InvalidKind(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
