//! Page view query service
//!
//! Read-only aggregations over the ledger: visits per page, visits per
//! weekday and reconstructed navigation paths. Every query accepts an
//! optional [`ReadContext`] so several queries can share one snapshot.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use tracing::debug;

use crate::errors::{HistoryError, Result};
use crate::services::navigation::reconstruct_paths;
use crate::storage::{
    HistoryStore, Page, PageViewCount, PageViewDay, PageViewRecord, ReadContext, VisitHandle,
};
use crate::utils::TimeParser;

/// 访问统计服务
pub struct AnalyticsService {
    store: Arc<HistoryStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    /// 严格解析日期范围，解析失败时返回错误
    ///
    /// Both bounds are inclusive; a bare end date covers its whole day.
    /// With neither bound the last 30 days are used.
    pub fn parse_date_range_strict(
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        match (start_date, end_date) {
            (Some(s), Some(e)) => {
                let start = TimeParser::parse_date(s).ok_or_else(|| {
                    HistoryError::date_parse(format!(
                        "Invalid start date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                        s
                    ))
                })?;
                let end = TimeParser::parse_date_end(e).ok_or_else(|| {
                    HistoryError::date_parse(format!(
                        "Invalid end date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                        e
                    ))
                })?;
                if start > end {
                    return Err(HistoryError::validation(
                        "Start date must not be later than end date",
                    ));
                }
                Ok((start, end))
            }
            (Some(_), None) => Err(HistoryError::validation(
                "Start date is provided but end date is missing",
            )),
            (None, Some(_)) => Err(HistoryError::validation(
                "End date is provided but start date is missing",
            )),
            (None, None) => Ok(Self::default_date_range()),
        }
    }

    fn default_date_range() -> (DateTime<Utc>, DateTime<Utc>) {
        let end = Utc::now();
        let start = end - Duration::days(30);
        (start, end)
    }

    /// Open a snapshot shared by the queries that receive it.
    pub async fn begin_read(&self) -> Result<ReadContext> {
        self.store.begin_read().await
    }

    /// One entry per page with at least one visit in `[start, end]`.
    pub async fn fetch_page_view_counts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<PageViewCount>> {
        let counts = self.store.fetch_page_view_counts(start, end, ctx).await?;
        debug!(
            "Page view counts {} .. {}: {} pages",
            start,
            end,
            counts.len()
        );
        Ok(counts)
    }

    /// Weekday buckets in the local calendar.
    pub async fn fetch_page_view_dates(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<PageViewDay>> {
        self.fetch_page_view_dates_in(start, end, &Local, ctx).await
    }

    /// Weekday buckets in the calendar of `tz`.
    pub async fn fetch_page_view_dates_in<Tz: TimeZone>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<PageViewDay>> {
        self.store.fetch_page_view_dates(start, end, tz, ctx).await
    }

    /// Every root-to-leaf navigation path, each sorted by timestamp.
    pub async fn fetch_linked_page_views(
        &self,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<Vec<PageViewRecord>>> {
        let records = self.store.load_page_view_records(ctx).await?;
        let total = records.len();
        let paths = reconstruct_paths(records)?;
        debug!("Reconstructed {} paths from {} page views", paths.len(), total);
        Ok(paths)
    }

    pub async fn get_page_view(&self, handle: VisitHandle) -> Result<Option<PageViewRecord>> {
        self.store.get_page_view(handle).await
    }

    pub async fn load_pages(&self) -> Result<Vec<Page>> {
        self.store.load_pages().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_range_strict_inclusive_end_of_day() {
        let (start, end) =
            AnalyticsService::parse_date_range_strict(Some("2024-01-01"), Some("2024-01-01"))
                .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(end >= Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_date_range_strict_rfc3339_end_is_exact() {
        let (_, end) = AnalyticsService::parse_date_range_strict(
            Some("2024-01-01T00:00:00Z"),
            Some("2024-01-02T12:00:00Z"),
        )
        .unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_range_strict_rejects_inverted_range() {
        let err =
            AnalyticsService::parse_date_range_strict(Some("2024-02-01"), Some("2024-01-01"))
                .unwrap_err();
        assert!(matches!(err, HistoryError::Validation(_)));
    }

    #[test]
    fn test_parse_date_range_strict_rejects_half_range() {
        assert!(AnalyticsService::parse_date_range_strict(Some("2024-01-01"), None).is_err());
        assert!(AnalyticsService::parse_date_range_strict(None, Some("2024-01-01")).is_err());
    }

    #[test]
    fn test_parse_date_range_strict_bad_format() {
        let err = AnalyticsService::parse_date_range_strict(Some("Jan 1"), Some("2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, HistoryError::DateParse(_)));
    }

    #[test]
    fn test_parse_date_range_strict_default_is_thirty_days() {
        let (start, end) = AnalyticsService::parse_date_range_strict(None, None).unwrap();
        assert_eq!(end - start, Duration::days(30));
    }
}
