//! Command-line shell driving the screens against the configured adapters.

mod args;
mod commands;

pub use args::{AdminCommand, Cli, Command, ReportArgs};
pub use commands::{CliError, run};
