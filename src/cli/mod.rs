//! CLI command definitions and handlers

mod annotate;
mod evolution;
mod history;
mod init;
mod list;
mod target;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::models::KindQuery;
use crate::reporters::OutputFormat;

/// Parse an entity kind (auto, function, class, struct, enum, interface, impl)
fn parse_kind(s: &str) -> Result<KindQuery, String> {
    s.parse().map_err(|e: crate::error::HistoryError| e.to_string())
}

/// Parse and validate a commit cap (at least 1)
fn parse_max_commits(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("max-commits must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// fnhist - the git history of a single function, class or struct
#[derive(Parser, Debug)]
#[command(name = "fnhist")]
#[command(
    version,
    about = "Trace the git history of one function, class, struct or impl block",
    long_about = "fnhist locates a named entity in every revision of a file, builds the \
timeline of commits that created, modified or deleted it, and can annotate each of \
its current lines with the commits that produced it.\n\n\
Works on local repositories and on GitHub repositories over the API.\n\n\
Supported languages: Python, TypeScript, JavaScript, Rust, Go, Java, C#, C, C++, Ruby",
    after_help = "\
Examples:
  fnhist history src/parser.py parse_header          Timeline of a function
  fnhist history src/lib.rs Config --kind struct     Only match a struct
  fnhist annotate src/parser.py parse_header         Per-line provenance
  fnhist evolution src/parser.py parse_header        Source at every change
  fnhist list src/parser.py                          Entities in a file
  fnhist history https://github.com/o/r/blob/main/src/app.py main
  fnhist --format json history src/app.py main       JSON for scripting"
)]
pub struct Cli {
    /// Repository path or GitHub URL (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub repo: String,

    /// Output format: text, json
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Timeline of commits that created, modified or deleted an entity
    #[command(after_help = "\
Examples:
  fnhist history app.py handle_request
  fnhist history src/lib.rs Parser --kind impl
  fnhist history app.py main --max-commits 50")]
    History {
        /// File containing the entity (repository-relative, or a GitHub file URL)
        file: String,

        /// Entity name
        name: String,

        /// Entity kind: auto, function, class, struct, enum, interface, impl
        #[arg(long, short = 'k', default_value = "auto", value_parser = parse_kind)]
        kind: KindQuery,

        /// Only walk the newest N commits touching the file
        #[arg(long, value_parser = parse_max_commits)]
        max_commits: Option<usize>,
    },

    /// Current lines of an entity with the commits that produced each one
    Annotate {
        /// File containing the entity (repository-relative, or a GitHub file URL)
        file: String,

        /// Entity name
        name: String,

        /// Entity kind: auto, function, class, struct, enum, interface, impl
        #[arg(long, short = 'k', default_value = "auto", value_parser = parse_kind)]
        kind: KindQuery,

        /// Only walk the newest N commits touching the file
        #[arg(long, value_parser = parse_max_commits)]
        max_commits: Option<usize>,
    },

    /// Source of an entity at every commit that changed its text
    Evolution {
        /// File containing the entity (repository-relative, or a GitHub file URL)
        file: String,

        /// Entity name
        name: String,

        /// Entity kind: auto, function, class, struct, enum, interface, impl
        #[arg(long, short = 'k', default_value = "auto", value_parser = parse_kind)]
        kind: KindQuery,

        /// Only walk the newest N commits touching the file
        #[arg(long, value_parser = parse_max_commits)]
        max_commits: Option<usize>,
    },

    /// List the entities declared in a file at HEAD
    List {
        /// File to inspect (repository-relative, or a GitHub file URL)
        file: String,
    },

    /// Write an example user config file
    Init,
}

/// Run CLI command
pub fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse()?;

    match cli.command {
        Commands::History {
            file,
            name,
            kind,
            max_commits,
        } => history::run(&cli.repo, &file, &name, kind, max_commits, format),

        Commands::Annotate {
            file,
            name,
            kind,
            max_commits,
        } => annotate::run(&cli.repo, &file, &name, kind, max_commits, format),

        Commands::Evolution {
            file,
            name,
            kind,
            max_commits,
        } => evolution::run(&cli.repo, &file, &name, kind, max_commits, format),

        Commands::List { file } => list::run(&cli.repo, &file, format),

        Commands::Init => init::run(),
    }
}

/// Spinner on stderr while the commit walk runs. Hidden when stderr is not
/// a terminal.
fn walk_spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}
