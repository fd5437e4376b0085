//! fnhist - trace the git history of a single function, class or struct

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fnhist::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level; logs go to stderr so reports stay clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fnhist={}", cli.log_level)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
