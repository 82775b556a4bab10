//! pages 表迁移
//!
//! Page identity catalog. The unique index on (project_id, namespace_id,
//! title) backs the insert-if-absent upsert used by every writer.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Pages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Pages::ProjectId).string_len(255).not_null())
                    .col(ColumnDef::new(Pages::NamespaceId).integer().not_null())
                    .col(ColumnDef::new(Pages::Title).text().not_null())
                    .col(
                        ColumnDef::new(Pages::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pages_identity")
                    .table(Pages::Table)
                    .col(Pages::ProjectId)
                    .col(Pages::NamespaceId)
                    .col(Pages::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_pages_identity").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Pages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Pages {
    #[sea_orm(iden = "pages")]
    Table,
    Id,
    ProjectId,
    NamespaceId,
    Title,
    Timestamp,
}
