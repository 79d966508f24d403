//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ReportCategory;

/// `campus-trace` arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "campus-trace",
    about = "Report campus issues and manage them from the terminal",
    version
)]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,
    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level actions. Each one navigates through the route guards.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in with Google.
    Login,
    /// Sign out and forget the stored session.
    Logout,
    /// Show who is signed in.
    Whoami,
    /// Show what a path renders for the current session.
    Open {
        /// Route path such as `/`, `/login` or `/admin`.
        path: String,
    },
    /// Drop a pin on the map and submit a report for it.
    Report(ReportArgs),
    /// List your own reports.
    Mine,
    /// Admin dashboard actions.
    #[command(subcommand)]
    Admin(AdminCommand),
}

/// Pin placement and form input for `report`.
#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Latitude of the initial click.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    /// Longitude of the initial click.
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
    /// Latitude the pin is dragged to before confirming.
    #[arg(long = "adjust-lat", allow_hyphen_values = true, requires = "adjust_lng")]
    pub adjust_lat: Option<f64>,
    /// Longitude the pin is dragged to before confirming.
    #[arg(long = "adjust-lng", allow_hyphen_values = true, requires = "adjust_lat")]
    pub adjust_lng: Option<f64>,
    /// Issue category (Infrastructure, Safety, Cleanliness, Accessibility, Lighting, Other).
    #[arg(long, value_parser = parse_category)]
    pub category: Option<ReportCategory>,
    /// Free-text description.
    #[arg(long)]
    pub description: Option<String>,
}

/// `admin` subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum AdminCommand {
    /// List every report, newest first.
    List,
    /// Select a report and centre the map on it.
    Select {
        /// Report identifier.
        id: String,
    },
    /// Mark an open report resolved.
    Resolve {
        /// Report identifier.
        id: String,
    },
    /// Write the listed reports to a CSV file.
    Export {
        /// Directory receiving `campus-reports-<date>.csv`.
        #[arg(long, value_name = "path", default_value = ".")]
        dir: PathBuf,
    },
}

fn parse_category(raw: &str) -> Result<ReportCategory, String> {
    raw.parse().map_err(|error| format!("{error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn report_arguments_parse_with_adjustment() {
        let cli = Cli::try_parse_from([
            "campus-trace",
            "report",
            "--lat",
            "12.97",
            "--lng",
            "79.16",
            "--adjust-lat",
            "12.971",
            "--adjust-lng",
            "79.161",
            "--category",
            "lighting",
        ])
        .expect("parse");

        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.category, Some(ReportCategory::Lighting));
        assert_eq!(args.adjust_lat, Some(12.971));
        assert_eq!(args.description, None);
    }

    #[test]
    fn adjustment_needs_both_axes() {
        let result = Cli::try_parse_from([
            "campus-trace",
            "report",
            "--lat",
            "1",
            "--lng",
            "2",
            "--adjust-lat",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[rstest]
    #[case("Graffiti")]
    #[case("")]
    fn unknown_categories_are_rejected(#[case] category: &str) {
        let result = Cli::try_parse_from([
            "campus-trace",
            "report",
            "--lat",
            "1",
            "--lng",
            "2",
            "--category",
            category,
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn log_json_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["campus-trace", "admin", "export", "--log-json"])
            .expect("parse");
        assert!(cli.log_json);
        assert!(matches!(
            cli.command,
            Command::Admin(AdminCommand::Export { ref dir }) if dir == &PathBuf::from(".")
        ));
    }
}
