//! Configuration handling for pqutil
//!
//! Database settings normally come from the `DB_*` environment variables.
//! A TOML file with the same shape as [`Config`] can be used instead.

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};

/// The postgres host (default is "localhost")
pub const ENV_KEY_HOST: &str = "DB_HOST";
/// The postgres port (default is "5432")
pub const ENV_KEY_PORT: &str = "DB_PORT";
/// The postgres user
pub const ENV_KEY_USER: &str = "DB_USER";
/// The postgres password
pub const ENV_KEY_PASSWORD: &str = "DB_PASSWORD";
/// The postgres database to connect to
pub const ENV_KEY_DATABASE: &str = "DB_DATABASE";
/// The postgres ssl mode to use (default is "disable")
pub const ENV_KEY_SSL_MODE: &str = "DB_SSL_MODE";
/// Overrides the migration history table name (default is "goose_db_version")
pub const ENV_KEY_GOOSE_TABLE: &str = "GOOSE_TABLE";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: &str = "5432";
const DEFAULT_SSL_MODE: &str = "disable";
const DEFAULT_MIGRATIONS_DIR: &str = "/sql";
const DEFAULT_MIGRATIONS_TABLE: &str = "goose_db_version";

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete pqutil configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub migrations: MigrationsConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig::from_lookup(&lookup)?;
        let mut migrations = MigrationsConfig::default();
        if let Some(table) = non_empty(lookup(ENV_KEY_GOOSE_TABLE)) {
            migrations.table = table;
        }

        Ok(Self {
            database,
            migrations,
            logging: None,
        })
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            ssl_mode: DEFAULT_SSL_MODE.to_string(),
            timeout_seconds: None,
        }
    }
}

impl DatabaseConfig {
    /// Read the `DB_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the `DB_*` keys through `lookup`. Unset and empty values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            non_empty(lookup(key)).unwrap_or_else(|| default.to_string())
        };

        let port = read(ENV_KEY_PORT, DEFAULT_PORT);
        let port = port.parse::<u16>().map_err(|e| {
            Error::ConfigError(format!("invalid {} {:?}: {}", ENV_KEY_PORT, port, e))
        })?;

        Ok(Self {
            host: read(ENV_KEY_HOST, DEFAULT_HOST),
            port,
            user: read(ENV_KEY_USER, ""),
            password: read(ENV_KEY_PASSWORD, ""),
            database: read(ENV_KEY_DATABASE, ""),
            ssl_mode: read(ENV_KEY_SSL_MODE, DEFAULT_SSL_MODE),
            timeout_seconds: None,
        })
    }
}

/// Migration settings configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MigrationsConfig {
    pub directory: String,
    pub table: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_MIGRATIONS_DIR.to_string(),
            table: DEFAULT_MIGRATIONS_TABLE.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
    pub include_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
            include_timestamps: false,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
