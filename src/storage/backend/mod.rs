//! SeaORM storage backend
//!
//! SQLite-backed page identity store and visit ledger.
//!
//! Writes go through [`HistoryStore`]'s write gate and a single database
//! transaction each, replayed when another connection holds the SQLite write
//! lock; reads run inside a [`ReadContext`] snapshot.

mod connection;
mod context;
mod converters;
mod mutations;
mod operations;
mod query;
pub mod retry;

use std::sync::Arc;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{HistoryError, Result};

pub use connection::{connect_sqlite, run_migrations};
pub use context::ReadContext;
pub use converters::{model_to_page, model_to_record};
pub use query::bucket_by_weekday;

use retry::TxnError;

/// 从数据库 URL 推断数据库类型
///
/// Only SQLite is supported: the ledger is a per-user embedded store.
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else {
        Err(HistoryError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported formats: sqlite://, *.db, *.sqlite",
            database_url
        )))
    }
}

/// Turn a bare path into a sqlite URL; URLs pass through.
pub fn normalize_sqlite_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else if database_url == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite://{}?mode=rwc", database_url)
    }
}

/// Map a driver error, keeping connectivity failures distinguishable.
pub(crate) fn map_db_err(context: &str, err: DbErr) -> HistoryError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
            HistoryError::store_unavailable(format!("{}: {}", context, err))
        }
        other => HistoryError::database_operation(format!("{}: {}", context, other)),
    }
}

/// Page identity store + visit ledger over one SQLite database.
///
/// Cloning is cheap and clones share the write gate, so they form a single
/// write context. Stores opened separately on the same file are independent
/// write contexts; SQLite locking and column-level upserts keep them
/// consistent (last writer wins per property).
#[derive(Clone)]
pub struct HistoryStore {
    db: DatabaseConnection,
    write_gate: Arc<Mutex<()>>,
    retry_config: retry::RetryConfig,
    import_batch_size: usize,
}

impl HistoryStore {
    /// Open the store using the global database settings.
    pub async fn new(database_url: &str) -> Result<Self> {
        let config = crate::config::get_config();
        let mut store = Self::open(database_url, &config.database).await?;
        store.import_batch_size = config.history.import_batch_size.max(1);
        Ok(store)
    }

    pub async fn open(database_url: &str, database: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(HistoryError::store_unavailable("DATABASE_URL is not set"));
        }
        infer_backend_from_url(database_url)?;

        let retry_config = retry::RetryConfig {
            max_retries: database.retry_count,
            base_delay_ms: database.retry_base_delay_ms,
            max_delay_ms: database.retry_max_delay_ms,
        };

        let url = normalize_sqlite_url(database_url);
        let db = connect_sqlite(&url, database.pool_size, database.timeout).await?;

        let store = HistoryStore {
            db,
            write_gate: Arc::new(Mutex::new(())),
            retry_config,
            import_batch_size: 500,
        };

        run_migrations(&store.db).await?;

        info!("Page view history store opened at {}", url);
        Ok(store)
    }

    /// Override the number of records committed per import transaction.
    pub fn with_import_batch_size(mut self, batch_size: usize) -> Self {
        self.import_batch_size = batch_size.max(1);
        self
    }

    pub fn import_batch_size(&self) -> usize {
        self.import_batch_size
    }

    /// Open a snapshot-consistent read scope.
    pub async fn begin_read(&self) -> Result<ReadContext> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| map_db_err("Failed to open read context", e))?;
        Ok(ReadContext::new(txn))
    }

    /// Enter the write context: serialize against other writers sharing this
    /// store, then open the transaction the mutation runs in.
    async fn begin_write(
        &self,
    ) -> std::result::Result<(MutexGuard<'_, ()>, DatabaseTransaction), TxnError> {
        let guard = self.write_gate.lock().await;
        let txn = self.open_write_txn().await?;
        Ok((guard, txn))
    }

    /// Open a transaction that already owns the SQLite write lock.
    ///
    /// A deferred transaction that reads first cannot wait for the lock later:
    /// SQLite fails its upgrade with SQLITE_BUSY as soon as another connection
    /// has committed. The no-op UPDATE takes the lock up front, where the busy
    /// timeout still applies. Caller holds the write gate.
    async fn open_write_txn(&self) -> std::result::Result<DatabaseTransaction, TxnError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(TxnError::db("Failed to open write context"))?;
        txn.execute_unprepared("UPDATE pages SET id = id WHERE 0")
            .await
            .map_err(TxnError::db("Failed to take the write lock"))?;
        Ok(txn)
    }
}
