//! List command - entities declared in a file at HEAD

use anyhow::{anyhow, Result};

use super::target;
use crate::error::HistoryError;
use crate::reporters::{self, OutputFormat, Report};

/// Run the list command
pub fn run(repo: &str, file: &str, format: OutputFormat) -> Result<()> {
    let target = target::resolve(repo, file)?;
    let locator = target.locator();
    let language = locator
        .detect_language(&target.file_path)
        .ok_or_else(|| HistoryError::UnsupportedLanguage(target.file_path.clone()))?;

    let head = target.backend.head();
    let source = target
        .backend
        .file_content_at(&head, &target.file_path)?
        .ok_or_else(|| anyhow!("{} does not exist at {}", target.file_path, head))?;

    let entities = locator.list(&source, language);
    println!(
        "{}",
        reporters::render(
            Report::Listing {
                file_path: &target.file_path,
                entities: &entities,
            },
            format
        )?
    );
    Ok(())
}
