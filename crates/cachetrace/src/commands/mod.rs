//! Command implementations.
//!
//! Each submodule handles a specific CLI command.

mod dump;
mod inspect;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Inspect { input, format } => inspect::cmd_inspect(input, *format),
        Commands::Dump { input, limit } => dump::cmd_dump(input, *limit),
    }
}
