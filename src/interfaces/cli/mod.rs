//! CLI interface module
//!
//! Runs parsed [`Commands`] against the history services.

pub mod commands;

use std::fmt;
use std::sync::Arc;

use crate::cli::Commands;
use crate::errors::HistoryError;
use crate::services::{AnalyticsService, PageViewService};
use crate::storage::StorageFactory;

#[derive(Debug)]
pub enum CliError {
    History(HistoryError),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::History(err) => err.format_simple(),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::History(err) => err.format_colored(),
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<HistoryError> for CliError {
    fn from(err: HistoryError) -> Self {
        CliError::History(err)
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    // config-gen doesn't need a database
    if let Commands::ConfigGen { output_path, force } = cmd {
        return commands::generate_config(output_path, force);
    }

    let store = StorageFactory::create().await?;
    let pageviews = PageViewService::new(Arc::clone(&store));
    let analytics = AnalyticsService::new(store);

    match cmd {
        Commands::Visit {
            title,
            project,
            namespace,
            previous,
            at,
        } => commands::record_visit(&pageviews, title, project, namespace, previous, at).await,

        Commands::Dwell { handle, seconds } => {
            commands::add_dwell(&pageviews, handle, seconds).await
        }

        Commands::Delete {
            title,
            project,
            namespace,
        } => commands::delete_page(&pageviews, title, project, namespace).await,

        Commands::Clear { yes } => commands::clear_history(&pageviews, yes).await,

        Commands::Import { file_path } => commands::import_legacy(&pageviews, file_path).await,

        Commands::Pages { json } => commands::list_pages(&analytics, json).await,

        Commands::Counts { start, end, json } => {
            commands::show_counts(&analytics, start, end, json).await
        }

        Commands::Weekdays {
            start,
            end,
            utc,
            json,
        } => commands::show_weekdays(&analytics, start, end, utc, json).await,

        Commands::Paths { json } => commands::show_paths(&analytics, json).await,

        Commands::ConfigGen { .. } => unreachable!("handled above"),
    }
}
