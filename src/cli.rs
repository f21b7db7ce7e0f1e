//! CLI surface for the wrapper's own commands.
//!
//! Anything that is not a wrapper command passes through to `bd` verbatim
//! (a leading `--` forces pass-through even for names the wrapper claims).

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "bdh",
    version,
    about = "Coordination wrapper around the bd issue tracker",
    after_help = "Any other invocation is passed through to `bd` verbatim.\n\
                  Use a leading `--` to pass through a name bdh reserves,\n\
                  and `--:jump-in` to override a pre-flight rejection."
)]
pub struct Cli {
    /// Verbose logging (RUST_LOG overrides).
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: WrapperCommand,
}

#[derive(Debug, Subcommand)]
pub enum WrapperCommand {
    /// Show BeadHub server status.
    Status,
    /// List workspaces known to the project.
    Workspaces {
        /// Include workspaces whose presence has expired.
        #[arg(long)]
        all: bool,
    },
}

/// Wrapper command names clap should handle; everything else is bd's.
pub const WRAPPER_COMMANDS: &[&str] = &["status", "workspaces"];

/// Whether this argument vector is for the wrapper itself.
#[must_use]
pub fn is_wrapper_invocation(args: &[String]) -> bool {
    match args.first().map(String::as_str) {
        None => true,
        Some(first) => {
            WRAPPER_COMMANDS.contains(&first)
                || matches!(first, "-h" | "--help" | "-V" | "--version" | "help" | "--verbose")
        }
    }
}
