//! Page view mutation service
//!
//! Entry point for everything that writes history. Wraps [`HistoryStore`]
//! with the caller-facing contract: absent visits and pages are benign
//! no-ops, category cleanup runs after deletions, and store failures are
//! surfaced unchanged.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::Result;
use crate::services::categories::{CategoryStore, NullCategoryStore};
use crate::storage::{HistoryStore, LegacyPageView, VisitHandle};
use crate::utils::csv_handler;

/// 页面访问记录服务
pub struct PageViewService {
    store: Arc<HistoryStore>,
    categories: Arc<dyn CategoryStore>,
}

impl PageViewService {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self::with_categories(store, Arc::new(NullCategoryStore))
    }

    pub fn with_categories(store: Arc<HistoryStore>, categories: Arc<dyn CategoryStore>) -> Self {
        Self { store, categories }
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Record a visit starting now.
    pub async fn add_page_view(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
        previous: Option<VisitHandle>,
    ) -> Result<VisitHandle> {
        self.add_page_view_at(title, namespace_id, project, previous, Utc::now())
            .await
    }

    pub async fn add_page_view_at(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
        previous: Option<VisitHandle>,
        at: DateTime<Utc>,
    ) -> Result<VisitHandle> {
        self.store
            .add_page_view_at(title, namespace_id, project, previous, at)
            .await
    }

    /// Add dwell time to a visit. A visit deleted in the meantime is skipped.
    pub async fn add_page_view_seconds(&self, handle: VisitHandle, seconds: f64) -> Result<()> {
        match self.store.add_page_view_seconds(handle, seconds).await {
            Err(e) if e.is_not_found() => {
                debug!("Skipping dwell update for {}: {}", handle, e.message());
                Ok(())
            }
            other => other,
        }
    }

    /// Delete every visit of a page and prune empty categories.
    ///
    /// Returns the number of visits removed; an unknown page removes
    /// nothing and skips the cleanup.
    pub async fn delete_page_view(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
    ) -> Result<u64> {
        let deleted = match self
            .store
            .delete_page_view(title, namespace_id, project)
            .await
        {
            Ok(deleted) => deleted,
            Err(e) if e.is_not_found() => {
                debug!("Nothing to delete: {}", e.message());
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        self.categories.delete_empty_categories().await?;
        Ok(deleted)
    }

    /// Wipe the ledger, the identity catalog and all categories.
    pub async fn delete_all(&self) -> Result<u64> {
        let deleted = self.store.delete_all().await?;
        self.categories.delete_all().await?;
        Ok(deleted)
    }

    pub async fn import_page_views(&self, records: &[LegacyPageView]) -> Result<usize> {
        self.store.import_page_views(records).await
    }

    /// Read a legacy CSV export and import it.
    pub async fn import_legacy_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let records = csv_handler::import_legacy_csv(path)?;
        info!(
            "Read {} legacy page views from {}",
            records.len(),
            path.display()
        );
        self.import_page_views(&records).await
    }
}
