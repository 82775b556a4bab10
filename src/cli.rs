//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for `pageviews` using clap's derive macros.

use clap::{Parser, Subcommand};

/// pageviews - Page view history store
#[derive(Parser)]
#[command(name = "pageviews")]
#[command(version)]
#[command(about = "Record and analyze page view history", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Override database.database_url
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Record a visit and print its handle
    Visit {
        /// Page title
        title: String,

        /// Project identifier, e.g. wikipedia~en
        #[arg(long, short = 'p')]
        project: String,

        /// Namespace id
        #[arg(long, short = 'n', default_value_t = 0)]
        namespace: i32,

        /// Handle of the visit this one was navigated from (pv-N)
        #[arg(long)]
        previous: Option<String>,

        /// Visit start (RFC3339 or YYYY-MM-DD, default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Add dwell time to a visit
    Dwell {
        /// Visit handle (pv-N)
        handle: String,

        /// Seconds to add
        seconds: f64,
    },

    /// Delete every visit of a page
    Delete {
        /// Page title
        title: String,

        #[arg(long, short = 'p')]
        project: String,

        #[arg(long, short = 'n', default_value_t = 0)]
        namespace: i32,
    },

    /// Delete all history
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },

    /// Import a legacy CSV export (title,project,viewed_at)
    Import {
        /// Input file path
        file_path: String,
    },

    /// List every known page
    Pages {
        #[arg(long)]
        json: bool,
    },

    /// Visits per page in a date range
    Counts {
        /// Range start (RFC3339 or YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Inclusive range end (RFC3339 or YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Visits per weekday in a date range
    Weekdays {
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Bucket by the UTC calendar instead of the local one
        #[arg(long)]
        utc: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print every reconstructed navigation path
    Paths {
        #[arg(long)]
        json: bool,
    },

    /// Generate example configuration file
    ConfigGen {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_visit() {
        let cli = Cli::try_parse_from([
            "pageviews",
            "visit",
            "Main_Page",
            "--project",
            "wikipedia~en",
            "--previous",
            "pv-3",
        ])
        .unwrap();

        match cli.command {
            Commands::Visit {
                title,
                project,
                namespace,
                previous,
                at,
            } => {
                assert_eq!(title, "Main_Page");
                assert_eq!(project, "wikipedia~en");
                assert_eq!(namespace, 0);
                assert_eq!(previous.as_deref(), Some("pv-3"));
                assert!(at.is_none());
            }
            _ => panic!("expected visit"),
        }
    }

    #[test]
    fn test_parse_global_database_after_subcommand() {
        let cli = Cli::try_parse_from(["pageviews", "pages", "--database", ":memory:"]).unwrap();
        assert_eq!(cli.database.as_deref(), Some(":memory:"));
    }
}
