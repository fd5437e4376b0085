//! Text (terminal) reporter with colors and formatting

use super::Report;
use crate::diff::changed_lines;
use crate::models::{
    AnnotatedEntity, ChangeKind, CommitRecord, EntityEvolution, EntityHistory, EntitySpan,
};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";

fn change_color(change: ChangeKind) -> &'static str {
    match change {
        ChangeKind::Created => "\x1b[32m",  // Green
        ChangeKind::Modified => "\x1b[33m", // Yellow
        ChangeKind::Deleted => "\x1b[31m",  // Red
    }
}

/// Render report as formatted terminal output
pub fn render(report: Report<'_>) -> String {
    match report {
        Report::History(history) => render_history(history),
        Report::Annotated(entity) => render_annotated(entity),
        Report::Evolution(evolution) => render_evolution(evolution),
        Report::Listing {
            file_path,
            entities,
        } => render_listing(file_path, entities),
    }
}

fn short_date(commit: &CommitRecord) -> String {
    commit.timestamp.format("%Y-%m-%d").to_string()
}

/// `abc1234 2024-01-31 Ada Lovelace: subject`
fn commit_line(commit: &CommitRecord) -> String {
    format!(
        "{YELLOW}{}{RESET} {} {}: {}",
        commit.short_hash,
        short_date(commit),
        commit.author_name,
        commit.subject
    )
}

fn render_history(history: &EntityHistory) -> String {
    let mut out = String::new();

    let kind = history
        .current
        .as_ref()
        .or_else(|| history.changes.iter().find_map(|c| c.span.as_ref()))
        .map(|span| span.kind.to_string())
        .unwrap_or_else(|| "entity".to_string());
    out.push_str(&format!(
        "\n{BOLD}{}{RESET} ({}) in {}\n",
        history.name, kind, history.file_path
    ));
    out.push_str(&format!("{DIM}{}{RESET}\n", history.repository));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));

    match &history.current {
        Some(span) => out.push_str(&format!(
            "Current: lines {}-{}  {}\n",
            span.start_line, span.end_line, span.signature
        )),
        None => out.push_str("Current: not present at HEAD\n"),
    }

    if history.changes.is_empty() {
        out.push_str("\nNo recorded changes.\n");
        return out;
    }

    if let Some(first) = &history.first_appeared {
        out.push_str(&format!("First appeared: {}\n", commit_line(first)));
    }
    if let Some(last) = &history.last_modified {
        out.push_str(&format!("Last changed:   {}\n", commit_line(last)));
    }
    out.push_str(&format!("Changes: {}\n\n", history.total_changes));

    for change in &history.changes {
        let lines = match &change.span {
            Some(span) => format!("lines {}-{}", span.start_line, span.end_line),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "  {YELLOW}{}{RESET}  {}  {}{:<8}{RESET}  {:<12}  {:<20} {}\n",
            change.commit.short_hash,
            short_date(&change.commit),
            change_color(change.change),
            change.change,
            lines,
            truncate(&change.commit.author_name, 20),
            change.commit.subject
        ));
    }

    out
}

fn render_annotated(entity: &AnnotatedEntity) -> String {
    let mut out = String::new();
    let span = &entity.span;

    out.push_str(&format!(
        "\n{BOLD}{}{RESET} {}:{}-{}\n",
        entity.name, entity.file_path, span.start_line, span.end_line
    ));
    out.push_str(&format!("{DIM}{}{RESET}\n", span.signature));
    if let Some(created) = &entity.created_at {
        out.push_str(&format!("Created in {}\n", commit_line(created)));
    }
    out.push_str(&format!(
        "{} commits touched these lines\n\n",
        entity.total_commits
    ));

    let width = span.end_line.to_string().len();
    for line in &entity.lines {
        out.push_str(&format!(
            "{DIM}{:>width$}{RESET} {YELLOW}{}{RESET} {DIM}({}){RESET} │ {}\n",
            line.line_number,
            line.blame_commit.short_hash,
            line.history.len(),
            line.content,
            width = width
        ));
    }

    out
}

fn render_evolution(evolution: &EntityEvolution) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{BOLD}{}{RESET} ({}) in {}: {} snapshots\n",
        evolution.name,
        evolution.kind,
        evolution.file_path,
        evolution.snapshots.len()
    ));

    let mut previous: Option<&str> = None;
    for snapshot in &evolution.snapshots {
        out.push_str(&format!(
            "\n{BOLD}══{RESET} {}{}{RESET} {}\n",
            change_color(snapshot.change),
            snapshot.change,
            commit_line(&snapshot.commit)
        ));
        match &snapshot.source {
            Some(source) => {
                let changed = changed_lines(previous, source);
                for (index, line) in source.lines().enumerate() {
                    if changed.binary_search(&index).is_ok() {
                        out.push_str(&format!("{GREEN}+ {}{RESET}\n", line));
                    } else {
                        out.push_str(&format!("  {}\n", line));
                    }
                }
                previous = Some(source);
            }
            None => {
                out.push_str(&format!("{DIM}  (deleted){RESET}\n"));
                previous = None;
            }
        }
    }

    out
}

fn render_listing(file_path: &str, entities: &[EntitySpan]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{BOLD}{}{RESET}: {} entities\n\n",
        file_path,
        entities.len()
    ));
    for span in entities {
        let name = match &span.parent {
            Some(parent) => format!("{}.{}", parent, span.name),
            None => span.name.clone(),
        };
        out.push_str(&format!(
            "  {:<9} {:<30} {DIM}{:>5}-{:<5}{RESET} {}\n",
            span.kind,
            truncate(&name, 30),
            span.start_line,
            span.end_line,
            span.signature
        ));
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
