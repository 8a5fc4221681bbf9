//! Database connection handling
//!
//! This module connects to PostgreSQL, retrying with a fixed delay until
//! the attempt budget runs out.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::utils::logging::{LogSink, NoopSink};

/// Delay between two connection attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

const POOL_SIZE: u32 = 5;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// What a connection was established with. The password is never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub ssl_mode: String,
}

impl From<&DatabaseConfig> for ConnectionInfo {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            database: config.database.clone(),
            ssl_mode: config.ssl_mode.clone(),
        }
    }
}

/// A live connection pool plus the settings it was opened with
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
    info: ConnectionInfo,
}

impl DatabaseConnection {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// The user the connection was made as
    pub fn username(&self) -> &str {
        &self.info.user
    }

    /// The database that was connected to
    pub fn database_name(&self) -> &str {
        &self.info.database
    }

    /// Start a transaction
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Close every connection in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Connect using the `DB_*` environment variables.
///
/// Makes up to `attempts` tries, [`RETRY_DELAY`] apart. Nothing is logged.
/// Use [`connect_with`] to pass a [`LogSink`].
pub async fn connect(attempts: u32) -> Result<DatabaseConnection> {
    let config = DatabaseConfig::from_env()?;
    connect_with(&config, attempts, &NoopSink).await
}

/// Connect with explicit settings, trying up to `attempts` times.
///
/// Each failure with budget left is reported to `log` at debug level,
/// followed by a [`RETRY_DELAY`] sleep. There is no overall deadline. Drop
/// the future to give up early. An `attempts` of 0 is treated as 1.
/// Configuration errors fail immediately and are not retried.
pub async fn connect_with(
    config: &DatabaseConfig,
    attempts: u32,
    log: &dyn LogSink,
) -> Result<DatabaseConnection> {
    let options = connect_options(config)?;
    let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));
    let attempts = attempts.max(1);
    let mut remaining = attempts;

    loop {
        let result = PgPoolOptions::new()
            .max_connections(POOL_SIZE)
            .acquire_timeout(timeout)
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                if config.ssl_mode == "disable" {
                    log.info(format_args!("connected to {} with SSL disabled", config.host));
                }

                return Ok(DatabaseConnection {
                    pool,
                    info: ConnectionInfo::from(config),
                });
            }
            Err(e) => {
                remaining -= 1;
                if remaining == 0 {
                    return Err(Error::ConnectionFailed {
                        attempts,
                        source: e,
                    });
                }

                log.debug(format_args!(
                    "error connecting to database, {} attempts remaining: {}",
                    remaining, e
                ));
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Translate a [`DatabaseConfig`] into driver connect options
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let ssl_mode = config.ssl_mode.parse::<PgSslMode>().map_err(|e| {
        Error::ConfigError(format!("invalid ssl mode {:?}: {}", config.ssl_mode, e))
    })?;

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .ssl_mode(ssl_mode);

    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if !config.database.is_empty() {
        options = options.database(&config.database);
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn local_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "nobody".to_string(),
            password: "secret".to_string(),
            database: "nothing".to_string(),
            ssl_mode: "disable".to_string(),
            timeout_seconds: Some(1),
        }
    }

    #[derive(Default)]
    struct Recorder {
        debug: Mutex<Vec<String>>,
    }

    impl LogSink for Recorder {
        fn debug(&self, args: std::fmt::Arguments<'_>) {
            self.debug.lock().unwrap().push(args.to_string());
        }
    }

    #[test]
    fn test_connect_options() {
        let options = connect_options(&local_config()).unwrap();
        assert_eq!(options.get_host(), "127.0.0.1");
        assert_eq!(options.get_port(), 1);
        assert_eq!(options.get_username(), "nobody");
        assert_eq!(options.get_database(), Some("nothing"));
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = local_config();
        config.ssl_mode = "sometimes".to_string();
        assert!(matches!(connect_options(&config), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_connection_info_drops_password() {
        let info = ConnectionInfo::from(&local_config());
        assert_eq!(info.user, "nobody");
        assert_eq!(info.database, "nothing");
        assert!(!format!("{:?}", info).contains("secret"));
    }

    #[tokio::test]
    async fn test_single_attempt_fails_without_retry() {
        let sink = Recorder::default();
        let err = connect_with(&local_config(), 0, &sink).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionFailed { attempts: 1, .. }));
        assert!(sink.debug.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_reports_remaining_attempts() {
        let sink = Recorder::default();
        let err = connect_with(&local_config(), 2, &sink).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionFailed { attempts: 2, .. }));
        let lines = sink.debug.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("error connecting to database, 1 attempts remaining: "));
    }
}
