//! Database module for pqutil
//!
//! This module handles database connections, transactions and migrations.

pub mod connection;
pub mod diagnostics;
pub mod migrations;
pub mod rollback;

// Re-export key types
pub use connection::{connect, connect_with, ConnectionInfo, DatabaseConnection};
pub use migrations::{MigrationCommand, Migrator};
pub use rollback::handle_rollback;
