//! Migration management
//!
//! Migrations are plain SQL files named `<version>_<name>.sql` in the goose
//! layout: an `-- +goose Up` section and, optionally, an `-- +goose Down`
//! section. Applied versions are tracked in a goose-compatible history table
//! (`goose_db_version` by default), and every migration runs in its own
//! transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Executor, PgConnection};

use crate::config::MigrationsConfig;
use crate::db::connection::DatabaseConnection;
use crate::db::rollback::handle_rollback;
use crate::error::{Error, Result};
use crate::utils::naming;

/// Marks the start of the SQL run when applying a migration
pub const UP_MARKER: &str = "-- +goose Up";
/// Marks the start of the SQL run when rolling a migration back
pub const DOWN_MARKER: &str = "-- +goose Down";

static FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_(.+)\.sql$").expect("migration file pattern is valid"));

const TEMPLATE: &str = "-- +goose Up
-- +goose StatementBegin
SELECT 'up SQL query';
-- +goose StatementEnd

-- +goose Down
-- +goose StatementBegin
SELECT 'down SQL query';
-- +goose StatementEnd
";

/// A migration file read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub path: PathBuf,
    pub up: String,
    pub down: String,
    pub checksum: String,
}

impl Migration {
    /// Build a migration from a file name and its contents
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let (version, name) = parse_file_name(file_name).ok_or_else(|| {
            Error::MigrationError(format!("not a migration file name: {}", path.display()))
        })?;

        let (up, down) = split_sections(contents).map_err(|e| match e {
            Error::MigrationError(msg) => {
                Error::MigrationError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        Ok(Self {
            version,
            name,
            path: path.to_path_buf(),
            up,
            down,
            checksum: format!("{:x}", md5::compute(contents.as_bytes())),
        })
    }
}

/// Which way a step moves the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One migration applied or rolled back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub version: i64,
    pub direction: Direction,
}

impl Step {
    fn up(version: i64) -> Self {
        Self {
            version,
            direction: Direction::Up,
        }
    }

    fn down(version: i64) -> Self {
        Self {
            version,
            direction: Direction::Down,
        }
    }
}

/// Commands that change the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCommand {
    /// Apply every pending migration
    Up,
    /// Apply pending migrations up to and including a version
    UpTo(i64),
    /// Roll back the latest applied migration
    Down,
    /// Roll back every applied migration newer than a version
    DownTo(i64),
    /// Roll back the latest applied migration and apply it again
    Redo,
    /// Roll back every applied migration
    Reset,
}

/// A known migration and when it was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Split `<version>_<name>.sql` into its parts. Version 0 is reserved.
pub fn parse_file_name(file_name: &str) -> Option<(i64, String)> {
    let captures = FILE_NAME.captures(file_name)?;
    let version = captures[1].parse::<i64>().ok().filter(|v| *v > 0)?;
    Some((version, captures[2].to_string()))
}

/// Split a migration file into its Up and Down SQL
pub fn split_sections(contents: &str) -> Result<(String, String)> {
    let mut up: Option<Vec<&str>> = None;
    let mut down: Option<Vec<&str>> = None;
    let mut current: Option<Direction> = None;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed == UP_MARKER {
            if up.is_some() {
                return Err(Error::MigrationError(format!("duplicate {:?}", UP_MARKER)));
            }
            up = Some(Vec::new());
            current = Some(Direction::Up);
            continue;
        }
        if trimmed == DOWN_MARKER {
            if down.is_some() {
                return Err(Error::MigrationError(format!("duplicate {:?}", DOWN_MARKER)));
            }
            down = Some(Vec::new());
            current = Some(Direction::Down);
            continue;
        }

        match current {
            Some(Direction::Up) => up.get_or_insert_with(Vec::new).push(line),
            Some(Direction::Down) => down.get_or_insert_with(Vec::new).push(line),
            None => {}
        }
    }

    let up = up.ok_or_else(|| Error::MigrationError(format!("missing {:?}", UP_MARKER)))?;

    Ok((
        up.join("\n").trim().to_string(),
        down.unwrap_or_default().join("\n").trim().to_string(),
    ))
}

/// Read every migration in `dir`, sorted by version.
///
/// Files that do not look like migrations are skipped. A missing directory
/// is an error, as are two files with the same version.
pub fn load_migrations(dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations: BTreeMap<i64, Migration> = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_migration = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| parse_file_name(n).is_some());
        if !is_migration {
            tracing::debug!(path = %path.display(), "Skipping non-migration file");
            continue;
        }

        let contents = fs::read_to_string(&path)?;
        let migration = Migration::parse(&path, &contents)?;

        if let Some(existing) = migrations.get(&migration.version) {
            return Err(Error::MigrationError(format!(
                "duplicate version {}: {} and {}",
                migration.version,
                existing.path.display(),
                migration.path.display()
            )));
        }
        migrations.insert(migration.version, migration);
    }

    Ok(migrations.into_values().collect())
}

/// Write a new, empty migration file named after the current UTC time.
///
/// Only `sql` migrations are supported.
pub fn create_migration(dir: &Path, name: &str, kind: &str) -> Result<PathBuf> {
    if kind != "sql" {
        return Err(Error::MigrationError(format!(
            "unsupported migration type {:?}: only sql migrations are supported",
            kind
        )));
    }
    if naming::migration_slug(name).is_empty() {
        return Err(Error::MigrationError(format!("invalid migration name {:?}", name)));
    }

    fs::create_dir_all(dir)?;

    let version = generate_version();
    let path = dir.join(naming::migration_file_name(version, name));
    if path.exists() {
        return Err(Error::MigrationError(format!(
            "migration file already exists: {}",
            path.display()
        )));
    }

    fs::write(&path, TEMPLATE)?;
    Ok(path)
}

/// Work out which steps `command` needs, given the migrations on disk
/// (sorted by version) and the versions already applied
pub fn plan(
    command: MigrationCommand,
    available: &[Migration],
    applied: &BTreeSet<i64>,
) -> Result<Vec<Step>> {
    let known: BTreeSet<i64> = available.iter().map(|m| m.version).collect();

    let require_known = |version: i64| -> Result<()> {
        if known.contains(&version) {
            Ok(())
        } else {
            Err(Error::MigrationError(format!(
                "no migration file for version {}",
                version
            )))
        }
    };

    let rollback = |versions: Vec<i64>| -> Result<Vec<Step>> {
        versions
            .into_iter()
            .map(|v| require_known(v).map(|_| Step::down(v)))
            .collect()
    };

    let latest = || {
        applied
            .iter()
            .next_back()
            .copied()
            .ok_or_else(|| Error::MigrationError("no migrations applied".to_string()))
    };

    match command {
        MigrationCommand::Up => Ok(known
            .iter()
            .filter(|v| !applied.contains(*v))
            .map(|v| Step::up(*v))
            .collect()),
        MigrationCommand::UpTo(target) => {
            require_known(target)?;
            Ok(known
                .iter()
                .filter(|v| **v <= target && !applied.contains(*v))
                .map(|v| Step::up(*v))
                .collect())
        }
        MigrationCommand::Down => rollback(vec![latest()?]),
        MigrationCommand::DownTo(target) => {
            if target != 0 {
                require_known(target)?;
            }
            rollback(applied.iter().rev().filter(|v| **v > target).copied().collect())
        }
        MigrationCommand::Redo => {
            let version = latest()?;
            require_known(version)?;
            Ok(vec![Step::down(version), Step::up(version)])
        }
        MigrationCommand::Reset => rollback(applied.iter().rev().copied().collect()),
    }
}

/// Runs migrations from a directory against a connection
pub struct Migrator<'a> {
    connection: &'a DatabaseConnection,
    directory: PathBuf,
    table: String,
}

impl<'a> Migrator<'a> {
    /// Create a migrator. The history table name is checked here because it
    /// is written into SQL unquoted.
    pub fn new(connection: &'a DatabaseConnection, config: &MigrationsConfig) -> Result<Self> {
        if !naming::is_valid_table_name(&config.table) {
            return Err(Error::ConfigError(format!(
                "invalid migrations table name {:?}",
                config.table
            )));
        }

        Ok(Self {
            connection,
            directory: PathBuf::from(&config.directory),
            table: config.table.clone(),
        })
    }

    /// Run a command and return the steps that were executed
    pub async fn run(&self, command: MigrationCommand) -> Result<Vec<Step>> {
        let migrations = load_migrations(&self.directory)?;
        self.ensure_history_table().await?;
        let applied: BTreeSet<i64> = self.applied().await?.into_keys().collect();

        let steps = plan(command, &migrations, &applied)?;
        if steps.is_empty() {
            tracing::info!(command = ?command, "No migrations to run");
            return Ok(steps);
        }

        let by_version: BTreeMap<i64, &Migration> =
            migrations.iter().map(|m| (m.version, m)).collect();

        for step in &steps {
            // plan() only emits versions that exist on disk
            let migration = by_version.get(&step.version).ok_or_else(|| {
                Error::MigrationError(format!("no migration file for version {}", step.version))
            })?;
            self.apply_step(migration, step.direction).await?;
        }

        Ok(steps)
    }

    /// Every migration on disk with the time it was applied, if it was
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let migrations = load_migrations(&self.directory)?;
        self.ensure_history_table().await?;
        let applied = self.applied().await?;

        Ok(migrations
            .into_iter()
            .map(|m| MigrationStatus {
                version: m.version,
                applied_at: applied.get(&m.version).copied(),
                name: m.name,
            })
            .collect())
    }

    /// The highest applied version, or 0 when nothing is applied
    pub async fn version(&self) -> Result<i64> {
        self.ensure_history_table().await?;
        let applied = self.applied().await?;
        Ok(applied.keys().next_back().copied().unwrap_or(0))
    }

    async fn apply_step(&self, migration: &Migration, direction: Direction) -> Result<()> {
        let started = Instant::now();
        let mut tx = self.connection.begin().await?;

        let result = self.execute_step(&mut tx, migration, direction).await;
        if let Err(e) = result {
            tracing::error!(
                version = migration.version,
                name = %migration.name,
                direction = ?direction,
                error = %e,
                "Migration failed"
            );
            return Err(handle_rollback(tx, e).await);
        }
        tx.commit().await?;

        tracing::info!(
            version = migration.version,
            name = %migration.name,
            direction = ?direction,
            checksum = %migration.checksum,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Migration applied successfully"
        );
        Ok(())
    }

    async fn execute_step(
        &self,
        conn: &mut PgConnection,
        migration: &Migration,
        direction: Direction,
    ) -> Result<()> {
        let sql = match direction {
            Direction::Up => &migration.up,
            Direction::Down => &migration.down,
        };

        if !is_blank(sql) {
            // Sent without bind parameters, so multiple statements are allowed
            (&mut *conn).execute(sql.as_str()).await?;
        }

        match direction {
            Direction::Up => {
                let insert = format!(
                    "INSERT INTO {} (version_id, is_applied) VALUES ($1, TRUE)",
                    self.table
                );
                sqlx::query(&insert)
                    .bind(migration.version)
                    .execute(&mut *conn)
                    .await?;
            }
            Direction::Down => {
                let delete = format!("DELETE FROM {} WHERE version_id = $1", self.table);
                sqlx::query(&delete)
                    .bind(migration.version)
                    .execute(&mut *conn)
                    .await?;
            }
        }

        Ok(())
    }

    /// Ensure the migration history table exists, with goose's columns and
    /// its version 0 seed row
    async fn ensure_history_table(&self) -> Result<()> {
        let create_table_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                version_id BIGINT NOT NULL,
                is_applied BOOLEAN NOT NULL,
                tstamp TIMESTAMP NULL DEFAULT now()
            )",
            self.table
        );
        let seed_sql = format!(
            "INSERT INTO {table} (version_id, is_applied)
             SELECT 0, TRUE WHERE NOT EXISTS (SELECT 1 FROM {table})",
            table = self.table
        );

        self.connection.pool().execute(create_table_sql.as_str()).await?;
        self.connection.pool().execute(seed_sql.as_str()).await?;
        Ok(())
    }

    /// Applied versions and when they were applied. The newest row for a
    /// version decides its state; version 0 is the seed row.
    async fn applied(&self) -> Result<BTreeMap<i64, DateTime<Utc>>> {
        let sql = format!(
            "SELECT DISTINCT ON (version_id)
                version_id, is_applied, COALESCE(tstamp AT TIME ZONE 'UTC', now())
             FROM {}
             WHERE version_id > 0
             ORDER BY version_id, id DESC",
            self.table
        );
        let rows: Vec<(i64, bool, DateTime<Utc>)> = sqlx::query_as(&sql)
            .fetch_all(self.connection.pool())
            .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, is_applied, _)| *is_applied)
            .map(|(version, _, applied_at)| (version, applied_at))
            .collect())
    }
}

/// True when `sql` holds nothing but whitespace and `--` comments
fn is_blank(sql: &str) -> bool {
    sql.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with("--")
    })
}

/// Generate a migration version based on the current time
fn generate_version() -> i64 {
    // %Y%m%d%H%M%S is 14 digits, well inside i64
    Utc::now().format("%Y%m%d%H%M%S").to_string().parse().unwrap_or_default()
}
