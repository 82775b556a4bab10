//! Commands that write history

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::PageViewService;
use crate::storage::VisitHandle;
use crate::utils::TimeParser;

fn parse_handle(raw: &str) -> Result<VisitHandle, CliError> {
    raw.parse::<VisitHandle>()
        .map_err(|e| CliError::ParseError(e.message().to_string()))
}

pub async fn record_visit(
    service: &PageViewService,
    title: String,
    project: String,
    namespace: i32,
    previous: Option<String>,
    at: Option<String>,
) -> Result<(), CliError> {
    let previous = previous.as_deref().map(parse_handle).transpose()?;

    let handle = match at {
        Some(raw) => {
            let at = TimeParser::parse_instant(&raw)?;
            service
                .add_page_view_at(&title, namespace, &project, previous, at)
                .await?
        }
        None => {
            service
                .add_page_view(&title, namespace, &project, previous)
                .await?
        }
    };

    println!("{}", handle);
    Ok(())
}

pub async fn add_dwell(
    service: &PageViewService,
    handle: String,
    seconds: f64,
) -> Result<(), CliError> {
    let handle = parse_handle(&handle)?;
    service.add_page_view_seconds(handle, seconds).await?;
    println!(
        "{} Added {}s to {}",
        "✓".bold().green(),
        seconds.trunc(),
        handle.to_string().cyan()
    );
    Ok(())
}

pub async fn delete_page(
    service: &PageViewService,
    title: String,
    project: String,
    namespace: i32,
) -> Result<(), CliError> {
    let deleted = service.delete_page_view(&title, namespace, &project).await?;

    if deleted == 0 {
        println!("{} No history for '{}'", "ℹ".bold().blue(), title);
    } else {
        println!(
            "{} Deleted {} page views of '{}'",
            "✓".bold().green(),
            deleted.to_string().green(),
            title.cyan()
        );
    }
    Ok(())
}

pub async fn clear_history(service: &PageViewService, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::CommandError(
            "Refusing to delete all history without --yes".to_string(),
        ));
    }

    let deleted = service.delete_all().await?;
    println!(
        "{} Deleted all history ({} page views)",
        "✓".bold().green(),
        deleted
    );
    Ok(())
}

pub async fn import_legacy(service: &PageViewService, file_path: String) -> Result<(), CliError> {
    println!(
        "{} {}",
        "Importing legacy history from".yellow(),
        file_path.blue()
    );

    let imported = service.import_legacy_csv(&file_path).await?;

    println!(
        "{} Imported {} page views",
        "✓".bold().green(),
        imported.to_string().green()
    );
    Ok(())
}
