// CLI module
// Command-line parsing and the offline subcommands

mod args;
pub mod commands;

pub use args::{CliArgs, Command, EngineArgs, ListArgs, ReconcileArgs, RepairArgs, ServeArgs};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints the message and exits.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
