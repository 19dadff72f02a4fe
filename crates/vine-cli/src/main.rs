//! # vine
//!
//! Dependency compatibility checker for npm projects.
//!
//! This is the entry point for the `vine` binary. It handles argument parsing,
//! sets up logging and panic reporting, and dispatches to the command handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vine_core::{VineError, VineResult};

mod commands;
mod output;

use commands::check::CheckArgs;
use commands::{CommandContext, Outcome};
use output::errors::ErrorFormatter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_DATE"),
    ", ",
    env!("RUSTC_VERSION"),
    ")"
);

/// Checks that a project's dependency requirements are mutually satisfiable
#[derive(Parser)]
#[command(name = "vine", version, long_version = LONG_VERSION, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check declared and transitive requirements against what is installed
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting vine v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(error) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&error));
            ExitCode::from(2)
        },
    }
}

fn run_cli(cli: Cli) -> VineResult<Outcome> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| VineError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new()?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vine={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("vine encountered an unexpected error: {}", panic_info);
        eprintln!("vine hit an internal error. This is a bug.");
        eprintln!("Please report this at: https://github.com/vine-lang/vine/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
