//! PageViewService tests
//!
//! Covers the caller-facing contract on top of the store: benign no-ops for
//! absent records and category cleanup after deletions.

use std::io::Write;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pageview_history::config::init_config;
use pageview_history::errors::{HistoryError, Result};
use pageview_history::services::{CategoryStore, PageViewService};
use pageview_history::storage::{HistoryStore, VisitHandle};
use tempfile::{NamedTempFile, TempDir};

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

const PROJECT: &str = "wikipedia~en";

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, day, hour, 0, 0).unwrap()
}

/// 记录调用次数的分类存储
#[derive(Default)]
struct RecordingCategories {
    cleanups: AtomicUsize,
    wipes: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl CategoryStore for RecordingCategories {
    async fn delete_empty_categories(&self) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HistoryError::category_cleanup("category store offline"));
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.wipes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn create_service(
    categories: Arc<RecordingCategories>,
) -> (PageViewService, Arc<HistoryStore>, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("service.db").display()
    );
    let store = Arc::new(HistoryStore::new(&db_url).await.expect("store"));
    let service = PageViewService::with_categories(Arc::clone(&store), categories);
    (service, store, temp_dir)
}

#[cfg(test)]
mod mutation_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_page_view_uses_current_time() {
        let (service, store, _dir) = create_service(Arc::default()).await;

        let before = Utc::now();
        let handle = service
            .add_page_view("Now", 0, PROJECT, None)
            .await
            .unwrap();
        let after = Utc::now();

        let record = store.get_page_view(handle).await.unwrap().unwrap();
        assert!(record.timestamp >= before - chrono::Duration::seconds(1));
        assert!(record.timestamp <= after + chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_dwell_on_missing_visit_is_silent() {
        let (service, _store, _dir) = create_service(Arc::default()).await;
        let ghost: VisitHandle = "pv-404".parse().unwrap();

        service.add_page_view_seconds(ghost, 10.0).await.unwrap();
    }

    #[tokio::test]
    async fn test_dwell_validation_still_surfaces() {
        let (service, _store, _dir) = create_service(Arc::default()).await;
        let handle = service
            .add_page_view_at("Page", 0, PROJECT, None, at(1, 1))
            .await
            .unwrap();

        let err = service
            .add_page_view_seconds(handle, -3.0)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_runs_category_cleanup() {
        let categories = Arc::new(RecordingCategories::default());
        let (service, _store, _dir) = create_service(Arc::clone(&categories)).await;

        service
            .add_page_view_at("Page", 0, PROJECT, None, at(2, 1))
            .await
            .unwrap();

        let deleted = service.delete_page_view("Page", 0, PROJECT).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(categories.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_of_unknown_page_is_noop_without_cleanup() {
        let categories = Arc::new(RecordingCategories::default());
        let (service, _store, _dir) = create_service(Arc::clone(&categories)).await;

        let deleted = service.delete_page_view("Ghost", 0, PROJECT).await.unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(categories.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_category_cleanup_failure_propagates() {
        let categories = Arc::new(RecordingCategories {
            fail: true,
            ..Default::default()
        });
        let (service, store, _dir) = create_service(categories).await;

        service
            .add_page_view_at("Page", 0, PROJECT, None, at(3, 1))
            .await
            .unwrap();

        let err = service
            .delete_page_view("Page", 0, PROJECT)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::CategoryCleanup(_)));
        // the visits are already gone
        assert!(store.load_pages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_clears_categories() {
        let categories = Arc::new(RecordingCategories::default());
        let (service, store, _dir) = create_service(Arc::clone(&categories)).await;

        let old = service
            .add_page_view_at("Page", 0, PROJECT, None, at(4, 1))
            .await
            .unwrap();

        assert_eq!(service.delete_all().await.unwrap(), 1);
        assert_eq!(categories.wipes.load(Ordering::SeqCst), 1);
        assert!(store.get_page_view(old).await.unwrap().is_none());

        // stale handle after a wipe is a silent no-op
        service.add_page_view_seconds(old, 5.0).await.unwrap();
    }

    #[tokio::test]
    async fn test_import_legacy_csv() {
        let (service, store, _dir) = create_service(Arc::default()).await;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "title,project,viewed_at").unwrap();
        writeln!(file, "Cat,wikipedia~en,2024-07-01").unwrap();
        writeln!(file, "Cat,wikipedia~en,2024-07-02T08:30:00Z").unwrap();
        writeln!(file, "Dog,wikipedia~en,2024-07-02").unwrap();

        let imported = service.import_legacy_csv(file.path()).await.unwrap();
        assert_eq!(imported, 3);

        let counts = store
            .fetch_page_view_counts(at(1, 0), at(3, 0), None)
            .await
            .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].page.title, "Cat");
        assert_eq!(counts[0].count, 2);
    }
}
