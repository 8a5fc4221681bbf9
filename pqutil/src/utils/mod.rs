//! Utilities for pqutil
//!
//! This module provides logging setup and naming helpers used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use logging::{init_logging, LogSink, NoopSink, TracingSink};
pub use naming::{is_valid_table_name, migration_file_name, migration_slug};
