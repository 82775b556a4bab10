//! Query operations for HistoryStore
//!
//! This module contains all read-only database operations. Each public
//! method runs against the caller's [`ReadContext`] or, when none is given,
//! a fresh one that is closed before returning.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::converters::{model_to_page, model_to_record};
use super::{HistoryStore, ReadContext, map_db_err};
use crate::errors::Result;
use crate::storage::models::{Page, PageViewCount, PageViewDay, PageViewRecord, VisitHandle};

use migration::entities::{page, page_view};

/// 按页面分组的统计结果行
#[derive(Debug, FromQueryResult)]
struct PageCountRow {
    page_id: i64,
    count: i64,
}

/// Count timestamps per weekday of `tz` (1 = Sunday … 7 = Saturday).
///
/// Only weekdays that occur are returned, ascending by day number.
pub fn bucket_by_weekday<Tz: TimeZone>(
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
    tz: &Tz,
) -> Vec<PageViewDay> {
    let mut counts: BTreeMap<u32, u64> = BTreeMap::new();
    for timestamp in timestamps {
        let day = timestamp.with_timezone(tz).weekday().number_from_sunday();
        *counts.entry(day).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(day, view_count)| PageViewDay { day, view_count })
        .collect()
}

async fn page_view_counts_in<C: ConnectionTrait>(
    db: &C,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PageViewCount>> {
    let rows = page_view::Entity::find()
        .select_only()
        .column(page_view::Column::PageId)
        .column_as(page_view::Column::Id.count(), "count")
        .filter(page_view::Column::Timestamp.gte(start))
        .filter(page_view::Column::Timestamp.lte(end))
        .group_by(page_view::Column::PageId)
        .into_model::<PageCountRow>()
        .all(db)
        .await
        .map_err(|e| map_db_err("Failed to count page views", e))?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let pages: HashMap<i64, page::Model> = page::Entity::find()
        .filter(page::Column::Id.is_in(rows.iter().map(|row| row.page_id)))
        .all(db)
        .await
        .map_err(|e| map_db_err("Failed to load pages", e))?
        .into_iter()
        .map(|model| (model.id, model))
        .collect();

    let mut counts: Vec<PageViewCount> = rows
        .into_iter()
        .filter_map(|row| {
            pages.get(&row.page_id).map(|model| PageViewCount {
                page: model_to_page(model.clone()),
                count: row.count.max(0) as u64,
            })
        })
        .collect();

    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.page.title.cmp(&b.page.title))
    });
    Ok(counts)
}

async fn page_view_timestamps_in<C: ConnectionTrait>(
    db: &C,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    page_view::Entity::find()
        .select_only()
        .column(page_view::Column::Timestamp)
        .filter(page_view::Column::Timestamp.gte(start))
        .filter(page_view::Column::Timestamp.lte(end))
        .into_tuple::<DateTime<Utc>>()
        .all(db)
        .await
        .map_err(|e| map_db_err("Failed to load page view timestamps", e))
}

async fn all_records_in<C: ConnectionTrait>(db: &C) -> Result<Vec<PageViewRecord>> {
    let views = page_view::Entity::find()
        .order_by_asc(page_view::Column::Timestamp)
        .order_by_asc(page_view::Column::Id)
        .all(db)
        .await
        .map_err(|e| map_db_err("Failed to load page views", e))?;

    let pages: HashMap<i64, Page> = page::Entity::find()
        .all(db)
        .await
        .map_err(|e| map_db_err("Failed to load pages", e))?
        .into_iter()
        .map(|model| (model.id, model_to_page(model)))
        .collect();

    // page_id is a cascading foreign key, a miss means a concurrent delete
    Ok(views
        .into_iter()
        .filter_map(|view| {
            let page = pages.get(&view.page_id)?.clone();
            Some(model_to_record(view, page))
        })
        .collect())
}

impl HistoryStore {
    /// Visits per page with `start <= timestamp <= end`, busiest first.
    pub async fn fetch_page_view_counts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<PageViewCount>> {
        match ctx {
            Some(ctx) => page_view_counts_in(ctx.conn(), start, end).await,
            None => {
                let ctx = self.begin_read().await?;
                let counts = page_view_counts_in(ctx.conn(), start, end).await?;
                ctx.finish().await?;
                Ok(counts)
            }
        }
    }

    /// Visits in `[start, end]` bucketed by weekday of `tz`.
    pub async fn fetch_page_view_dates<Tz: TimeZone>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<PageViewDay>> {
        let timestamps = match ctx {
            Some(ctx) => page_view_timestamps_in(ctx.conn(), start, end).await?,
            None => {
                let ctx = self.begin_read().await?;
                let timestamps = page_view_timestamps_in(ctx.conn(), start, end).await?;
                ctx.finish().await?;
                timestamps
            }
        };
        Ok(bucket_by_weekday(timestamps, tz))
    }

    /// Every stored visit joined with its page, oldest first.
    pub async fn load_page_view_records(
        &self,
        ctx: Option<&ReadContext>,
    ) -> Result<Vec<PageViewRecord>> {
        match ctx {
            Some(ctx) => all_records_in(ctx.conn()).await,
            None => {
                let ctx = self.begin_read().await?;
                let records = all_records_in(ctx.conn()).await?;
                ctx.finish().await?;
                Ok(records)
            }
        }
    }

    pub async fn get_page_view(&self, handle: VisitHandle) -> Result<Option<PageViewRecord>> {
        let db = &self.db;

        let view = page_view::Entity::find_by_id(handle.id())
            .one(db)
            .await
            .map_err(|e| map_db_err("Failed to load page view", e))?;

        let Some(view) = view else {
            return Ok(None);
        };

        let page = page::Entity::find_by_id(view.page_id)
            .one(db)
            .await
            .map_err(|e| map_db_err("Failed to load page", e))?;

        Ok(page.map(|page| model_to_record(view, model_to_page(page))))
    }

    /// All known pages ordered by project, namespace and title.
    pub async fn load_pages(&self) -> Result<Vec<Page>> {
        let models = page::Entity::find()
            .order_by_asc(page::Column::ProjectId)
            .order_by_asc(page::Column::NamespaceId)
            .order_by_asc(page::Column::Title)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to load pages", e))?;

        Ok(models.into_iter().map(model_to_page).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_bucket_by_weekday_sorted_and_sparse() {
        // 2024-06-02 is a Sunday, 2024-06-05 a Wednesday, 2024-06-08 a Saturday
        let days = bucket_by_weekday(
            vec![at(2024, 6, 8, 10), at(2024, 6, 2, 9), at(2024, 6, 5, 1), at(2024, 6, 2, 23)],
            &Utc,
        );

        assert_eq!(
            days,
            vec![
                PageViewDay { day: 1, view_count: 2 },
                PageViewDay { day: 4, view_count: 1 },
                PageViewDay { day: 7, view_count: 1 },
            ]
        );
    }

    #[test]
    fn test_bucket_by_weekday_uses_calendar_of_timezone() {
        // Sunday 23:00 UTC is already Monday in UTC+2
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let days = bucket_by_weekday(vec![at(2024, 6, 2, 23)], &plus_two);
        assert_eq!(days, vec![PageViewDay { day: 2, view_count: 1 }]);
    }

    #[test]
    fn test_bucket_by_weekday_empty() {
        assert!(bucket_by_weekday(Vec::new(), &Utc).is_empty());
    }
}
