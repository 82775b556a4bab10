//! Service layer for business logic
//!
//! Mutation and query entry points shared by the CLI and library callers.

mod analytics_service;
pub mod categories;
pub mod navigation;
mod pageview_service;

pub use analytics_service::*;
pub use categories::{CategoryStore, NullCategoryStore};
pub use navigation::reconstruct_paths;
pub use pageview_service::*;
