//! Command-line layer
//!
//! Argument definitions live in `crate::config::cli`; this module holds the
//! command handlers and the log-level plumbing shared with the search
//! drivers.

mod commands;
pub mod logging;

pub use commands::run_command;
pub use logging::LogLevel;

pub use crate::config::Cli;
