use sea_orm::DatabaseTransaction;

use super::map_db_err;
use crate::errors::Result;

/// Snapshot-consistent read scope.
///
/// Every statement issued through one context sees the same database state,
/// so a query never observes half of a concurrent write. Contexts are cheap;
/// hold one across several queries when their results must agree.
///
/// An in-memory store (`:memory:`) lives on a single pooled connection and an
/// open context occupies it. Until the context is finished, mutations and
/// queries not run through it wait for the pool acquire timeout and then
/// fail with `StoreUnavailable`. Pass the context to every query in that
/// window, or finish it before writing.
pub struct ReadContext {
    txn: DatabaseTransaction,
}

impl ReadContext {
    pub(crate) fn new(txn: DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub(crate) fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Release the snapshot. Dropping the context has the same effect.
    pub async fn finish(self) -> Result<()> {
        self.txn
            .commit()
            .await
            .map_err(|e| map_db_err("Failed to close read context", e))
    }
}
