//! page_views 表迁移
//!
//! Visit ledger. Each row references its page (cascade on page delete) and
//! optionally the visit it was navigated from (set null when that visit is
//! deleted, turning the child into a new root).

use sea_orm_migration::prelude::*;

use crate::m20261017_000001_pages::Pages;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PageViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageViews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageViews::PageId).big_integer().not_null())
                    .col(
                        ColumnDef::new(PageViews::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PageViews::NumberOfSeconds)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PageViews::PreviousPageViewId)
                            .big_integer()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_views_page")
                            .from(PageViews::Table, PageViews::PageId)
                            .to(Pages::Table, Pages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_views_previous")
                            .from(PageViews::Table, PageViews::PreviousPageViewId)
                            .to(PageViews::Table, PageViews::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // 时间范围查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_timestamp")
                    .table(PageViews::Table)
                    .col(PageViews::Timestamp)
                    .to_owned(),
            )
            .await?;

        // 按页面分组 / 删除
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_page_id")
                    .table(PageViews::Table)
                    .col(PageViews::PageId)
                    .to_owned(),
            )
            .await?;

        // 子节点查找（导航树）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_previous")
                    .table(PageViews::Table)
                    .col(PageViews::PreviousPageViewId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_page_views_previous").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_page_views_page_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_page_views_timestamp").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PageViews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PageViews {
    #[sea_orm(iden = "page_views")]
    Table,
    Id,
    PageId,
    Timestamp,
    NumberOfSeconds,
    PreviousPageViewId,
}
