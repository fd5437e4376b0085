//! History command - entity timeline

use anyhow::Result;

use super::{target, walk_spinner};
use crate::error::HistoryError;
use crate::history::HistoryReconstructor;
use crate::models::KindQuery;
use crate::reporters::{self, OutputFormat, Report};

/// Run the history command
pub fn run(
    repo: &str,
    file: &str,
    name: &str,
    kind: KindQuery,
    max_commits: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let target = target::resolve(repo, file)?;
    let locator = target.locator();
    if locator.detect_language(&target.file_path).is_none() {
        return Err(HistoryError::UnsupportedLanguage(target.file_path.clone()).into());
    }

    let spinner = walk_spinner(format!("Tracing {} in {}...", name, target.file_path))?;
    let history = HistoryReconstructor::new(target.backend.as_ref(), &locator)
        .with_max_commits(target.max_commits(max_commits))
        .reconstruct_entity_history(&target.file_path, name, kind);
    spinner.finish_and_clear();
    let history = history?;

    if history.changes.is_empty() {
        return Err(HistoryError::NoHistory {
            entity: name.to_string(),
            file: target.file_path,
        }
        .into());
    }

    println!("{}", reporters::render(Report::History(&history), format)?);
    Ok(())
}
