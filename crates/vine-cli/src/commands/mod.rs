//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking a `CommandContext` and returning
//! an `Outcome` that decides the process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::info;
use vine_core::{VineError, VineResult};

pub mod check;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Create a new command context
    pub fn new() -> VineResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| VineError::io("Failed to get current directory".to_string(), e))?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
        })
    }
}

/// How a successful command run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing at error severity
    Clean,
    /// At least one error-severity finding
    Findings,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Findings => ExitCode::from(1),
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> VineResult<Outcome> {
    match command {
        Commands::Check(args) => {
            info!("Checking project (depth: {:?}, offline: {})", args.depth, args.offline);
            check::execute(args, ctx).await
        },
    }
}
