//! Read-only report commands

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::interfaces::cli::CliError;
use crate::services::AnalyticsService;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::CommandError(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

pub async fn list_pages(service: &AnalyticsService, json: bool) -> Result<(), CliError> {
    let pages = service.load_pages().await?;

    if json {
        return print_json(&pages);
    }

    if pages.is_empty() {
        println!("{} No pages found", "ℹ".bold().blue());
        return Ok(());
    }

    for page in &pages {
        println!(
            "  {} {} {}",
            page.project_id.dimmed(),
            format!("[{}]", page.namespace_id).dimmed(),
            page.title.cyan()
        );
    }
    println!();
    println!(
        "{} Total {} pages",
        "ℹ".bold().blue(),
        pages.len().to_string().green()
    );
    Ok(())
}

pub async fn show_counts(
    service: &AnalyticsService,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let (start, end) = AnalyticsService::parse_date_range_strict(start.as_deref(), end.as_deref())?;
    let counts = service.fetch_page_view_counts(start, end, None).await?;

    if json {
        return print_json(&counts);
    }

    if counts.is_empty() {
        println!("{} No page views in range", "ℹ".bold().blue());
        return Ok(());
    }

    for count in &counts {
        println!(
            "  {:>6}  {} {}",
            count.count.to_string().green(),
            count.page.title.cyan(),
            format!("({})", count.page.project_id).dimmed()
        );
    }
    Ok(())
}

pub async fn show_weekdays(
    service: &AnalyticsService,
    start: Option<String>,
    end: Option<String>,
    utc: bool,
    json: bool,
) -> Result<(), CliError> {
    let (start, end) = AnalyticsService::parse_date_range_strict(start.as_deref(), end.as_deref())?;
    let days = if utc {
        service
            .fetch_page_view_dates_in(start, end, &Utc, None)
            .await?
    } else {
        service.fetch_page_view_dates(start, end, None).await?
    };

    if json {
        return print_json(&days);
    }

    for day in &days {
        let name = WEEKDAY_NAMES
            .get(day.day.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("?");
        println!("  {}  {}", name.cyan(), day.view_count.to_string().green());
    }
    Ok(())
}

pub async fn show_paths(service: &AnalyticsService, json: bool) -> Result<(), CliError> {
    let paths = service.fetch_linked_page_views(None).await?;

    if json {
        return print_json(&paths);
    }

    if paths.is_empty() {
        println!("{} No navigation history", "ℹ".bold().blue());
        return Ok(());
    }

    for path in &paths {
        let titles: Vec<String> = path.iter().map(|view| view.page.title.clone()).collect();
        let seconds: i64 = path.iter().map(|view| view.number_of_seconds).sum();
        println!(
            "  {} {}",
            titles.join(" → ").cyan(),
            format!("({}s)", seconds).dimmed()
        );
    }
    println!();
    println!(
        "{} Total {} paths",
        "ℹ".bold().blue(),
        paths.len().to_string().green()
    );
    Ok(())
}
