//! pqutil: utilities for working with PostgreSQL
//!
//! Turns loosely structured filter and sort strings into parameterized SQL
//! fragments, connects with retry, rolls back failed transactions without
//! losing the original error, and runs SQL migrations.

pub mod config;
pub mod db;
pub mod error;
pub mod query;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::{connect, connect_with, ConnectionInfo, DatabaseConnection};
pub use db::migrations::{MigrationCommand, Migrator};
pub use db::rollback::handle_rollback;
pub use error::{Error, Result};
pub use query::{
    parse_amount_query, parse_sort, AmountFilter, QueryValue, SortDirection, SortSpec,
};
pub use utils::logging::{LogSink, NoopSink, TracingSink};
