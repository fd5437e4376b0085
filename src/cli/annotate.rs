//! Annotate command - per-line provenance

use anyhow::Result;

use super::{target, walk_spinner};
use crate::annotate::LineProvenanceAssembler;
use crate::error::HistoryError;
use crate::models::KindQuery;
use crate::reporters::{self, OutputFormat, Report};

/// Run the annotate command
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

    let spinner = walk_spinner(format!("Annotating {} in {}...", name, target.file_path))?;
    let annotated = LineProvenanceAssembler::new(target.backend.as_ref(), &locator)
        .with_max_commits(target.max_commits(max_commits))
        .annotate_entity_as(&target.file_path, name, kind);
    spinner.finish_and_clear();

    let Some(annotated) = annotated? else {
        return Err(HistoryError::EntityNotFound {
            entity: name.to_string(),
            file: target.file_path,
        }
        .into());
    };

    println!("{}", reporters::render(Report::Annotated(&annotated), format)?);
    Ok(())
}
