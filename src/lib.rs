//! pageview-history - Page view history store
//!
//! Records which pages a reader visited, how long each visit lasted and
//! which visit led to which, and answers aggregate queries over that
//! history: visits per page, visits per weekday and full navigation paths.
//!
//! # Architecture
//! - `storage`: SQLite page identity store and visit ledger (sea-orm)
//! - `services`: mutation and query services, path reconstruction
//! - `config`: static configuration (TOML + environment)
//! - `system`: logging setup
//! - `interfaces`: command-line front end
//! - `utils`: date parsing, legacy CSV import

pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;

pub use errors::{HistoryError, Result};
pub use services::{AnalyticsService, CategoryStore, NullCategoryStore, PageViewService};
pub use storage::{
    HistoryStore, LegacyPageView, Page, PageViewCount, PageViewDay, PageViewRecord, ReadContext,
    VisitHandle,
};
