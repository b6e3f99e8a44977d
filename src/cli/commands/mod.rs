//! CLI command implementations

mod datasets;
mod migrate;
mod report;
mod search;
mod stats;

use crate::cli::logging::LogLevel;
use crate::config::{Cli, Command};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);

    match cli.command {
        Command::Search(args) => search::run_search(args, level),
        Command::Report(command) => report::run_report(command, level),
        Command::Stats(args) => stats::run_stats(args, level),
        Command::Migrate(args) => migrate::run_migrate(args, level),
        Command::Datasets(args) => datasets::run_datasets(args, level),
    }
}
