use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::OnConflict};

use super::retry::TxnError;
use crate::errors::HistoryError;
use migration::entities::page;

type TxnResult<T> = std::result::Result<T, TxnError>;

/// Look up a page by its identity tuple. `title` must already be normalized.
pub(crate) async fn find_page<C: ConnectionTrait>(
    db: &C,
    project_id: &str,
    namespace_id: i32,
    title: &str,
) -> TxnResult<Option<page::Model>> {
    page::Entity::find()
        .filter(page::Column::ProjectId.eq(project_id))
        .filter(page::Column::NamespaceId.eq(namespace_id))
        .filter(page::Column::Title.eq(title))
        .one(db)
        .await
        .map_err(TxnError::db("Failed to look up page"))
}

/// 使用 ON CONFLICT 的原子 fetch-or-create
///
/// Inserts the page or, when the identity already exists, only bumps its
/// visit timestamp. The unique index makes this race-free across writers;
/// the follow-up read returns the surviving row.
pub(crate) async fn fetch_or_create_page<C: ConnectionTrait>(
    db: &C,
    project_id: &str,
    namespace_id: i32,
    title: &str,
    visited_at: DateTime<Utc>,
) -> TxnResult<page::Model> {
    use sea_orm::ActiveValue::{NotSet, Set};

    let active_model = page::ActiveModel {
        id: NotSet,
        project_id: Set(project_id.to_string()),
        namespace_id: Set(namespace_id),
        title: Set(title.to_string()),
        timestamp: Set(visited_at),
    };

    page::Entity::insert(active_model)
        .on_conflict(
            OnConflict::columns([
                page::Column::ProjectId,
                page::Column::NamespaceId,
                page::Column::Title,
            ])
            .update_column(page::Column::Timestamp)
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(TxnError::db("Failed to upsert page"))?;

    find_page(db, project_id, namespace_id, title)
        .await?
        .ok_or_else(|| {
            HistoryError::database_operation(format!(
                "Page '{}' (project: {}, namespace: {}) missing right after upsert",
                title, project_id, namespace_id
            ))
            .into()
        })
}
