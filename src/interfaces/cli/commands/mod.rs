//! CLI command implementations
//!
//! This module re-exports all CLI command functions.

mod config_gen;
mod history_management;
mod reports;

pub use config_gen::*;
pub use history_management::*;
pub use reports::*;
