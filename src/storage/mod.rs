use std::sync::Arc;

use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::{HistoryStore, ReadContext};
pub use models::{
    LegacyPageView, Page, PageViewCount, PageViewDay, PageViewRecord, ROOT_NAMESPACE, VisitHandle,
    normalize_title,
};

pub struct StorageFactory;

impl StorageFactory {
    /// Open the store named by `database.database_url` in the global config.
    pub async fn create() -> Result<Arc<HistoryStore>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        let store = HistoryStore::new(database_url).await?;
        Ok(Arc::new(store))
    }
}
