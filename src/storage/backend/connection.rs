use sea_orm::DatabaseConnection;
use tracing::info;

use crate::errors::{HistoryError, Result};
use migration::{Migrator, MigratorTrait};

/// 连接 SQLite 数据库（带自动创建和性能优化）
pub async fn connect_sqlite(
    database_url: &str,
    pool_size: u32,
    busy_timeout_secs: u64,
) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
    };
    use std::str::FromStr;

    let opt = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| HistoryError::store_unavailable(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(busy_timeout_secs.max(1)))
        .pragma("temp_store", "memory");

    // An in-memory database lives inside a single connection; see ReadContext
    // for what that means for open read contexts.
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        pool_size.max(1)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(busy_timeout_secs.max(1)))
        .connect_with(opt)
        .await
        .map_err(|e| {
            HistoryError::store_unavailable(format!("Cannot open SQLite database: {}", e))
        })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| HistoryError::store_unavailable(format!("Migration failed: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}
