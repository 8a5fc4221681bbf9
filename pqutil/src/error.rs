//! Error types for pqutil

use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

/// Result type for pqutil operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pqutil
#[derive(Error, Debug)]
pub enum Error {
    /// A filter token could not be split into an operator and a value
    #[error("invalid query for {key}: {token}")]
    InvalidQuery { key: String, token: String },

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    /// Holds the direction after normalization, not the raw input
    #[error("invalid sort order: {0}")]
    InvalidSortOrder(String),

    #[error("connecting to database failed after {attempts} attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// Rolling back after `source` failed as well
    #[error("rollback failed: {rollback}, {source}")]
    RollbackFailed {
        rollback: sqlx::Error,
        #[source]
        source: Box<Error>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl Error {
    /// Find the PostgreSQL server error behind this error, if any.
    ///
    /// For a failed rollback the original error is searched before the
    /// rollback failure.
    pub fn database_error(&self) -> Option<&PgDatabaseError> {
        match self {
            Error::SqlxError(e) | Error::ConnectionFailed { source: e, .. } => pg_error(e),
            Error::RollbackFailed { rollback, source } => {
                source.database_error().or_else(|| pg_error(rollback))
            }
            _ => None,
        }
    }
}

fn pg_error(error: &sqlx::Error) -> Option<&PgDatabaseError> {
    match error {
        sqlx::Error::Database(db) => db.try_downcast_ref::<PgDatabaseError>(),
        _ => None,
    }
}

/// Convert TOML deserialization errors to pqutil errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
