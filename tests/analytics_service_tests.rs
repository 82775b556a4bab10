//! AnalyticsService tests
//!
//! Query engine over a real SQLite store, including navigation paths.

use std::sync::Arc;
use std::sync::Once;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use pageview_history::config::init_config;
use pageview_history::services::{AnalyticsService, PageViewService};
use pageview_history::storage::{HistoryStore, VisitHandle};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

const PROJECT: &str = "wikipedia~en";

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 4, 12, 0, second).unwrap()
}

async fn create_services() -> (PageViewService, AnalyticsService, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("analytics.db").display()
    );
    let store = Arc::new(HistoryStore::new(&db_url).await.expect("store"));
    (
        PageViewService::new(Arc::clone(&store)),
        AnalyticsService::new(store),
        temp_dir,
    )
}

async fn visit(
    service: &PageViewService,
    title: &str,
    second: u32,
    previous: Option<VisitHandle>,
) -> VisitHandle {
    service
        .add_page_view_at(title, 0, PROJECT, previous, at(second))
        .await
        .unwrap()
}

fn titles(path: &[pageview_history::PageViewRecord]) -> Vec<String> {
    path.iter().map(|r| r.page.title.clone()).collect()
}

#[cfg(test)]
mod path_tests {
    use super::*;

    #[tokio::test]
    async fn test_branching_navigation_paths() {
        let (pageviews, analytics, _dir) = create_services().await;

        let a = visit(&pageviews, "A", 1, None).await;
        let b = visit(&pageviews, "B", 2, Some(a)).await;
        visit(&pageviews, "C", 3, Some(b)).await;
        visit(&pageviews, "D", 4, Some(b)).await;

        let paths = analytics.fetch_linked_page_views(None).await.unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(titles(&paths[0]), vec!["A", "B", "C"]);
        assert_eq!(titles(&paths[1]), vec!["A", "B", "D"]);
    }

    #[tokio::test]
    async fn test_every_visit_appears_and_paths_match_leaves() {
        let (pageviews, analytics, _dir) = create_services().await;

        let a = visit(&pageviews, "A", 1, None).await;
        visit(&pageviews, "B", 2, Some(a)).await;
        let c = visit(&pageviews, "C", 3, None).await;
        let d = visit(&pageviews, "D", 4, Some(c)).await;
        visit(&pageviews, "E", 5, Some(d)).await;
        visit(&pageviews, "F", 6, Some(d)).await;
        visit(&pageviews, "G", 7, None).await;

        let paths = analytics.fetch_linked_page_views(None).await.unwrap();

        // leaves: B, E, F, G
        assert_eq!(paths.len(), 4);
        let mut seen: Vec<String> = paths.iter().flat_map(|p| titles(p)).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen, vec!["A", "B", "C", "D", "E", "F", "G"]);
        for path in &paths {
            assert!(path.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }
    }

    #[tokio::test]
    async fn test_deleting_a_page_splits_its_tree() {
        let (pageviews, analytics, _dir) = create_services().await;

        let a = visit(&pageviews, "A", 1, None).await;
        let b = visit(&pageviews, "B", 2, Some(a)).await;
        visit(&pageviews, "C", 3, Some(b)).await;

        pageviews.delete_page_view("B", 0, PROJECT).await.unwrap();

        let paths = analytics.fetch_linked_page_views(None).await.unwrap();
        let mut summary: Vec<Vec<String>> = paths.iter().map(|p| titles(p)).collect();
        summary.sort();
        assert_eq!(summary, vec![vec!["A"], vec!["C"]]);
    }

    #[tokio::test]
    async fn test_no_history_no_paths() {
        let (_pageviews, analytics, _dir) = create_services().await;
        assert!(
            analytics
                .fetch_linked_page_views(None)
                .await
                .unwrap()
                .is_empty()
        );
    }
}

#[cfg(test)]
mod aggregate_tests {
    use super::*;

    #[tokio::test]
    async fn test_weekdays_follow_requested_calendar() {
        let (pageviews, analytics, _dir) = create_services().await;

        // 2024-08-04 is a Sunday; 23:30 UTC is Monday in UTC+2
        pageviews
            .add_page_view_at(
                "Late",
                0,
                PROJECT,
                None,
                Utc.with_ymd_and_hms(2024, 8, 4, 23, 30, 0).unwrap(),
            )
            .await
            .unwrap();

        let (start, end) =
            AnalyticsService::parse_date_range_strict(Some("2024-08-01"), Some("2024-08-10"))
                .unwrap();

        let utc_days = analytics
            .fetch_page_view_dates_in(start, end, &Utc, None)
            .await
            .unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let shifted = analytics
            .fetch_page_view_dates_in(start, end, &plus_two, None)
            .await
            .unwrap();

        assert_eq!(utc_days[0].day, 1);
        assert_eq!(shifted[0].day, 2);
    }

    #[tokio::test]
    async fn test_local_weekdays_partition_total() {
        let (pageviews, analytics, _dir) = create_services().await;
        for second in 0..6 {
            visit(&pageviews, "Page", second, None).await;
        }

        let days = analytics
            .fetch_page_view_dates(at(0), at(59), None)
            .await
            .unwrap();

        assert_eq!(days.iter().map(|d| d.view_count).sum::<u64>(), 6);
        let mut weekdays: Vec<u32> = days.iter().map(|d| d.day).collect();
        weekdays.dedup();
        assert_eq!(weekdays.len(), days.len());
        assert!(days.iter().all(|d| (1..=7).contains(&d.day)));
    }

    #[tokio::test]
    async fn test_date_only_end_includes_whole_day() {
        let (pageviews, analytics, _dir) = create_services().await;
        pageviews
            .add_page_view_at(
                "Evening",
                0,
                PROJECT,
                None,
                Utc.with_ymd_and_hms(2024, 8, 4, 22, 0, 0).unwrap(),
            )
            .await
            .unwrap();

        let (start, end) =
            AnalyticsService::parse_date_range_strict(Some("2024-08-04"), Some("2024-08-04"))
                .unwrap();
        let counts = analytics
            .fetch_page_view_counts(start, end, None)
            .await
            .unwrap();

        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 1);
    }

    #[tokio::test]
    async fn test_load_pages_and_get_page_view() {
        let (pageviews, analytics, _dir) = create_services().await;
        let handle = visit(&pageviews, "zebra", 1, None).await;
        visit(&pageviews, "Aardvark", 2, None).await;

        let pages = analytics.load_pages().await.unwrap();
        let names: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(names, vec!["Aardvark", "Zebra"]);

        let record = analytics.get_page_view(handle).await.unwrap().unwrap();
        assert_eq!(record.page.title, "Zebra");
    }
}
