//! Logging utilities for pqutil
//!
//! This module provides logging setup and the optional log sink used by the
//! connection bootstrap.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Receiver for the connection bootstrap's progress messages.
///
/// Both methods do nothing unless overridden, so a caller only implements
/// the levels it cares about.
pub trait LogSink: Send + Sync {
    fn debug(&self, _args: fmt::Arguments<'_>) {}

    fn info(&self, _args: fmt::Arguments<'_>) {}
}

/// Discards everything. Used when the caller does not supply a sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {}

/// Forwards messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!("{}", args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!("{}", args);
    }
}

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()), // No logging configuration, use defaults
    };

    let level = parse_level(&config.level);

    let mut env_filter = EnvFilter::from_default_env();
    for target in ["pqutil", "migrate"] {
        let directive = format!("{}={}", target, level)
            .parse::<Directive>()
            .map_err(|e| Error::ConfigError(format!("invalid log directive: {}", e)))?;
        env_filter = env_filter.add_directive(directive);
    }

    let writer = if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        BoxMakeWriter::new(Mutex::new(File::create(file_path)?))
    } else if config.stdout {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let builder = tracing_fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer);
    let json = config.format.eq_ignore_ascii_case("json");

    let result = match (json, config.include_timestamps) {
        (true, true) => tracing::subscriber::set_global_default(builder.json().finish()),
        (true, false) => {
            tracing::subscriber::set_global_default(builder.json().without_time().finish())
        }
        (false, true) => tracing::subscriber::set_global_default(builder.finish()),
        (false, false) => {
            tracing::subscriber::set_global_default(builder.without_time().finish())
        }
    };

    result.map_err(|e| Error::ConfigError(e.to_string()))
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // Default to INFO
    }
}
