//! Category cleanup collaborator
//!
//! Categories (tags attached to visited pages) live outside the ledger.
//! The history services only need to tell that store when to prune.

use async_trait::async_trait;

use crate::errors::Result;

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Remove every category left with zero referencing visits.
    async fn delete_empty_categories(&self) -> Result<()>;

    /// Remove every category.
    async fn delete_all(&self) -> Result<()>;
}

/// No category store attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCategoryStore;

#[async_trait]
impl CategoryStore for NullCategoryStore {
    async fn delete_empty_categories(&self) -> Result<()> {
        tracing::trace!("No category store attached, skipping empty category cleanup");
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        tracing::trace!("No category store attached, skipping category wipe");
        Ok(())
    }
}
