//! Mutation operations for HistoryStore
//!
//! Every method here runs inside the write context: the store's write gate
//! is held for the whole operation and all statements share one transaction.
//! A transaction that loses the SQLite write lock to another connection is
//! replayed from the start (see [`retry`]).

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, ExprTrait, QueryFilter, QuerySelect,
    sea_query::Expr,
};
use tracing::{debug, info, warn};

use super::operations::{fetch_or_create_page, find_page};
use super::retry::{self, TxnError};
use super::HistoryStore;
use crate::errors::{HistoryError, Result};
use crate::storage::models::{LegacyPageView, ROOT_NAMESPACE, VisitHandle, normalize_title};

use migration::entities::{page, page_view};

type TxnResult<T> = std::result::Result<T, TxnError>;

fn validate_identity(title: &str, project: &str) -> Result<()> {
    if title.is_empty() {
        return Err(HistoryError::validation("Page title is empty"));
    }
    if project.trim().is_empty() {
        return Err(HistoryError::validation("Project identifier is empty"));
    }
    Ok(())
}

/// Whole seconds to add for a dwell report. Fractions are dropped;
/// values beyond the column range saturate.
fn dwell_delta(seconds: f64) -> Result<i64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(HistoryError::validation(format!(
            "Dwell time must be a non-negative number of seconds, got {}",
            seconds
        )));
    }
    Ok(seconds.trunc() as i64)
}

/// `number_of_seconds + delta`, pinned at `i64::MAX` instead of overflowing
/// into a REAL. `delta` must be non-negative.
fn saturating_seconds_expr(delta: i64) -> Expr {
    Expr::case(
        page_view::Column::NumberOfSeconds.gt(i64::MAX - delta),
        i64::MAX,
    )
    .finally(Expr::col(page_view::Column::NumberOfSeconds).add(delta))
    .into()
}

/// Append one visit row. `previous` must already be resolved.
async fn insert_page_view(
    txn: &DatabaseTransaction,
    page_id: i64,
    timestamp: DateTime<Utc>,
    previous: Option<i64>,
) -> TxnResult<i64> {
    use sea_orm::ActiveValue::{NotSet, Set};

    let active_model = page_view::ActiveModel {
        id: NotSet,
        page_id: Set(page_id),
        timestamp: Set(timestamp),
        number_of_seconds: Set(0),
        previous_page_view_id: Set(previous),
    };

    let result = page_view::Entity::insert(active_model)
        .exec(txn)
        .await
        .map_err(TxnError::db("Failed to insert page view"))?;

    Ok(result.last_insert_id)
}

impl HistoryStore {
    /// Record a visit that starts at `at`.
    ///
    /// The page is fetched or created atomically. `previous` is linked only
    /// when it still resolves to a stored visit; a stale handle makes the new
    /// visit a root.
    pub async fn add_page_view_at(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
        previous: Option<VisitHandle>,
        at: DateTime<Utc>,
    ) -> Result<VisitHandle> {
        let title = normalize_title(title);
        validate_identity(&title, project)?;

        let handle = retry::retry_transaction("add_page_view", self.retry_config, || {
            self.add_page_view_once(&title, namespace_id, project, previous, at)
        })
        .await?;

        debug!("Page view {} recorded for '{}' ({})", handle, title, project);
        Ok(handle)
    }

    async fn add_page_view_once(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
        previous: Option<VisitHandle>,
        at: DateTime<Utc>,
    ) -> TxnResult<VisitHandle> {
        let (_gate, txn) = self.begin_write().await?;

        let page = fetch_or_create_page(&txn, project, namespace_id, title, at).await?;

        let previous_id = match previous {
            Some(handle) => {
                let found = page_view::Entity::find_by_id(handle.id())
                    .one(&txn)
                    .await
                    .map_err(TxnError::db("Failed to resolve previous page view"))?;
                if found.is_none() {
                    debug!(
                        "Previous page view {} no longer exists; recording a new root",
                        handle
                    );
                }
                found.map(|m| m.id)
            }
            None => None,
        };

        let id = insert_page_view(&txn, page.id, at, previous_id).await?;

        txn.commit()
            .await
            .map_err(TxnError::db("Failed to commit page view"))?;

        Ok(VisitHandle::new(id))
    }

    /// Add dwell time to a visit.
    ///
    /// `seconds` is truncated to whole seconds and the stored total saturates
    /// at `i64::MAX`. Returns `RecordNotFound` when the visit is gone.
    pub async fn add_page_view_seconds(&self, handle: VisitHandle, seconds: f64) -> Result<()> {
        let delta = dwell_delta(seconds)?;

        let rows_affected =
            retry::retry_transaction("add_page_view_seconds", self.retry_config, || {
                self.add_seconds_once(handle, delta)
            })
            .await?;

        if rows_affected == 0 {
            return Err(HistoryError::record_not_found(format!(
                "Page view not found: {}",
                handle
            )));
        }
        Ok(())
    }

    async fn add_seconds_once(&self, handle: VisitHandle, delta: i64) -> TxnResult<u64> {
        let _gate = self.write_gate.lock().await;

        // Single statement: the increment happens in SQL so concurrent
        // writers add up instead of overwriting each other.
        let result = page_view::Entity::update_many()
            .col_expr(
                page_view::Column::NumberOfSeconds,
                saturating_seconds_expr(delta),
            )
            .filter(page_view::Column::Id.eq(handle.id()))
            .exec(&self.db)
            .await
            .map_err(TxnError::db("Failed to update page view duration"))?;

        Ok(result.rows_affected)
    }

    /// Delete every visit of one page, then the page itself.
    ///
    /// Surviving visits that were navigated to from a deleted one become
    /// roots; they are not re-attached to an older ancestor. Returns the
    /// number of visits removed, or `RecordNotFound` for an unknown page.
    pub async fn delete_page_view(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
    ) -> Result<u64> {
        let title = normalize_title(title);

        let deleted = retry::retry_transaction("delete_page_view", self.retry_config, || {
            self.delete_page_view_once(&title, namespace_id, project)
        })
        .await?;

        info!(
            "Deleted {} page views of '{}' ({}:{})",
            deleted, title, project, namespace_id
        );
        Ok(deleted)
    }

    async fn delete_page_view_once(
        &self,
        title: &str,
        namespace_id: i32,
        project: &str,
    ) -> TxnResult<u64> {
        let (_gate, txn) = self.begin_write().await?;

        let Some(page) = find_page(&txn, project, namespace_id, title).await? else {
            return Err(HistoryError::record_not_found(format!(
                "Page not found: {} ({}:{})",
                title, project, namespace_id
            ))
            .into());
        };

        let view_ids: Vec<i64> = page_view::Entity::find()
            .select_only()
            .column(page_view::Column::Id)
            .filter(page_view::Column::PageId.eq(page.id))
            .into_tuple::<i64>()
            .all(&txn)
            .await
            .map_err(TxnError::db("Failed to list page views"))?;

        // 断开子节点：children of the deleted visits become roots
        if !view_ids.is_empty() {
            page_view::Entity::update_many()
                .col_expr(
                    page_view::Column::PreviousPageViewId,
                    Expr::value(Option::<i64>::None),
                )
                .filter(page_view::Column::PreviousPageViewId.is_in(view_ids.iter().copied()))
                .exec(&txn)
                .await
                .map_err(TxnError::db("Failed to detach child page views"))?;
        }

        let deleted = page_view::Entity::delete_many()
            .filter(page_view::Column::PageId.eq(page.id))
            .exec(&txn)
            .await
            .map_err(TxnError::db("Failed to delete page views"))?
            .rows_affected;

        page::Entity::delete_by_id(page.id)
            .exec(&txn)
            .await
            .map_err(TxnError::db("Failed to delete page"))?;

        txn.commit()
            .await
            .map_err(TxnError::db("Failed to commit page deletion"))?;

        Ok(deleted)
    }

    /// Clear the whole ledger and identity catalog. Returns the number of
    /// visits removed.
    pub async fn delete_all(&self) -> Result<u64> {
        let deleted =
            retry::retry_transaction("delete_all", self.retry_config, || self.delete_all_once())
                .await?;

        info!("Deleted all page history ({} page views)", deleted);
        Ok(deleted)
    }

    async fn delete_all_once(&self) -> TxnResult<u64> {
        let (_gate, txn) = self.begin_write().await?;

        let deleted = page_view::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(TxnError::db("Failed to delete page views"))?
            .rows_affected;

        page::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(TxnError::db("Failed to delete pages"))?;

        txn.commit()
            .await
            .map_err(TxnError::db("Failed to commit history wipe"))?;

        Ok(deleted)
    }

    /// 批量导入旧版访问记录
    ///
    /// Records land in the root namespace with no predecessor. Every
    /// `import_batch_size` records commit in their own transaction: a failing
    /// chunk is rolled back, chunks before it stay, and the caller gets
    /// `BatchPartialFailure` carrying the committed count. A store that
    /// becomes unreachable mid-import reports `StoreUnavailable` instead.
    pub async fn import_page_views(&self, records: &[LegacyPageView]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let total = records.len();
        let mut committed = 0usize;

        let _gate = self.write_gate.lock().await;

        for chunk in records.chunks(self.import_batch_size) {
            let outcome = retry::retry_transaction("import_page_views", self.retry_config, || {
                self.import_chunk(chunk)
            })
            .await;

            match outcome {
                Ok(()) => committed += chunk.len(),
                Err(e @ HistoryError::StoreUnavailable(_)) => {
                    warn!(
                        "Import lost the store after {} of {} records: {}",
                        committed, total, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Import stopped after {} of {} records: {}",
                        committed, total, e
                    );
                    return Err(HistoryError::batch_partial_failure(
                        committed,
                        total,
                        e.message().to_string(),
                    ));
                }
            }
        }

        info!("Imported {} legacy page views", committed);
        Ok(committed)
    }

    /// One import transaction. Caller holds the write gate.
    async fn import_chunk(&self, chunk: &[LegacyPageView]) -> TxnResult<()> {
        let txn = self.open_write_txn().await?;

        for record in chunk {
            let title = normalize_title(&record.title);
            validate_identity(&title, &record.project)?;

            let page = fetch_or_create_page(
                &txn,
                &record.project,
                ROOT_NAMESPACE,
                &title,
                record.viewed_date,
            )
            .await?;

            insert_page_view(&txn, page.id, record.viewed_date, None).await?;
        }

        txn.commit()
            .await
            .map_err(TxnError::db("Failed to commit import batch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dwell_delta_truncates() {
        assert_eq!(dwell_delta(2.7).unwrap(), 2);
        assert_eq!(dwell_delta(0.99).unwrap(), 0);
        assert_eq!(dwell_delta(5.0).unwrap(), 5);
    }

    #[test]
    fn test_dwell_delta_saturates() {
        assert_eq!(dwell_delta(1e300).unwrap(), i64::MAX);
    }

    #[test]
    fn test_dwell_delta_rejects_bad_input() {
        for bad in [-0.5, f64::NAN, f64::NEG_INFINITY, f64::INFINITY] {
            assert!(matches!(
                dwell_delta(bad),
                Err(HistoryError::Validation(_))
            ));
        }
    }
}
