//! Evolution command - entity source at every change

use anyhow::Result;

use super::{target, walk_spinner};
use crate::history::HistoryReconstructor;
use crate::models::KindQuery;
use crate::reporters::{self, OutputFormat, Report};

/// Run the evolution command
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

    let spinner = walk_spinner(format!("Collecting versions of {}...", name))?;
    let evolution = HistoryReconstructor::new(target.backend.as_ref(), &locator)
        .with_max_commits(target.max_commits(max_commits))
        .entity_evolution(&target.file_path, name, kind);
    spinner.finish_and_clear();
    let evolution = evolution?;

    println!("{}", reporters::render(Report::Evolution(&evolution), format)?);
    Ok(())
}
