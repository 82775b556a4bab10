//! 写事务重试
//!
//! Another connection holding the SQLite write lock surfaces as SQLITE_BUSY
//! or SQLITE_LOCKED once the busy timeout has run out. A write transaction
//! that hits it is rolled back and replayed from its first statement after a
//! jittered exponential backoff. Any other failure ends the write at once.

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::map_db_err;
use crate::errors::{HistoryError, Result};

/// True when `err` means another writer currently owns the database.
///
/// Connection and pool failures are not contention: they propagate as
/// `StoreUnavailable` without a replay.
pub fn is_lock_contention(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => {
            runtime_err_is_contention(runtime_err)
        }
        _ => false,
    }
}

fn runtime_err_is_contention(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(db_err) = sqlx_err.deref().as_database_error()
                && let Some(code) = db_err.code()
            {
                // SQLITE_BUSY, SQLITE_LOCKED and their extended codes
                return matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517");
            }
            mentions_lock(&sqlx_err.to_string())
        }
        RuntimeErr::Internal(msg) => mentions_lock(msg),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn mentions_lock(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("database is busy")
}

/// Replay budget for contended write transactions.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Why one attempt of a write transaction failed.
#[derive(Debug)]
pub(crate) enum TxnError {
    /// Lost the write lock race; the whole transaction may be replayed.
    Contention { context: &'static str, source: DbErr },
    Failed(HistoryError),
}

impl TxnError {
    /// Classify a driver error raised while running statement `context`.
    pub(crate) fn db(context: &'static str) -> impl Fn(DbErr) -> TxnError {
        move |source| {
            if is_lock_contention(&source) {
                TxnError::Contention { context, source }
            } else {
                TxnError::Failed(map_db_err(context, source))
            }
        }
    }

    fn into_history(self) -> HistoryError {
        match self {
            TxnError::Contention { context, source } => map_db_err(context, source),
            TxnError::Failed(err) => err,
        }
    }
}

impl From<HistoryError> for TxnError {
    fn from(err: HistoryError) -> Self {
        TxnError::Failed(err)
    }
}

/// Run `attempt` until it commits, replaying it on lock contention.
///
/// Each call of `attempt` must open, fill and commit its own transaction so
/// that a replay starts from a fresh snapshot. After `max_retries` replays the
/// contention error is returned as a `DatabaseOperation` failure.
pub(crate) async fn retry_transaction<T, F, Fut>(
    operation: &str,
    config: RetryConfig,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, TxnError>>,
{
    let mut replays = 0;
    loop {
        match attempt().await {
            Ok(value) => {
                if replays > 0 {
                    debug!("'{}' committed after {} replays", operation, replays);
                }
                return Ok(value);
            }
            Err(TxnError::Contention { context, source }) if replays < config.max_retries => {
                replays += 1;
                let delay = backoff_delay(replays, config);
                warn!(
                    "'{}' lost the write lock at '{}' ({}); replay {}/{} in {} ms",
                    operation, context, source, replays, config.max_retries, delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(err) => return Err(err.into_history()),
        }
    }
}

/// Delay before replay number `replay` (1-based): half of the capped
/// exponential step is fixed, the other half is random.
fn backoff_delay(replay: u32, config: RetryConfig) -> u64 {
    use rand::RngExt;

    let shift = replay.saturating_sub(1).min(20);
    let step = config
        .base_delay_ms
        .saturating_mul(1u64 << shift)
        .min(config.max_delay_ms);
    let floor = step / 2;
    floor + rand::rng().random_range(0..=step - floor)
}
