//! Transaction rollback helper

use sqlx::{Postgres, Transaction};

use crate::error::Error;

/// Roll back `tx` after `err` occurred.
///
/// Returns `err` unchanged when the rollback succeeds. Otherwise the
/// rollback failure and `err` are combined into
/// [`Error::RollbackFailed`]. The original error is never lost.
pub async fn handle_rollback(tx: Transaction<'_, Postgres>, err: Error) -> Error {
    rollback_outcome(tx.rollback().await, err)
}

fn rollback_outcome(rollback: std::result::Result<(), sqlx::Error>, err: Error) -> Error {
    match rollback {
        Ok(()) => err,
        Err(rollback) => Error::RollbackFailed {
            rollback,
            source: Box::new(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_rollback_returns_original() {
        let err = rollback_outcome(Ok(()), Error::MigrationError("boom".to_string()));
        assert!(matches!(err, Error::MigrationError(ref m) if m == "boom"));
    }

    #[test]
    fn test_failed_rollback_wraps_both() {
        let err = rollback_outcome(
            Err(sqlx::Error::PoolClosed),
            Error::MigrationError("boom".to_string()),
        );

        match &err {
            Error::RollbackFailed { rollback, source } => {
                assert!(matches!(rollback, sqlx::Error::PoolClosed));
                assert!(matches!(**source, Error::MigrationError(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("Migration error: boom"));
    }
}
