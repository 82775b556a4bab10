//! One visit to a page. `previous_page_view_id` links the visit the user
//! navigated from; the children of a visit are derived by querying this
//! column, never stored.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "page_views")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub page_id: i64,
    pub timestamp: DateTimeUtc,
    pub number_of_seconds: i64,
    pub previous_page_view_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
