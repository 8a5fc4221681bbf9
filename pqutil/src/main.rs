use std::ffi::OsString;
use std::path::Path;

use clap::{Parser, Subcommand};
use pqutil::config::{self, Config, LoggingConfig};
use pqutil::db::diagnostics;
use pqutil::db::migrations::{self, MigrationCommand, Migrator};
use pqutil::utils::logging::init_logging;
use pqutil::{connect_with, Error, Result, TracingSink};

#[derive(Parser)]
#[command(name = "migrate")]
#[command(about = "Run SQL migrations against PostgreSQL")]
#[command(after_help = "Examples:
    migrate status
    migrate create init sql
    migrate create add_some_column sql
    migrate up")]
struct Args {
    /// Directory with migration files [default: /sql]
    #[arg(short, long, global = true)]
    dir: Option<String>,

    /// TOML config file; the DB_* environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Connection attempts before giving up
    #[arg(long, default_value_t = 5, global = true)]
    attempts: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate the DB to the most recent version available
    Up,
    /// Migrate the DB to a specific VERSION
    UpTo { version: i64 },
    /// Roll back the version by 1
    Down,
    /// Roll back to a specific VERSION
    DownTo { version: i64 },
    /// Re-run the latest migration
    Redo,
    /// Roll back all migrations
    Reset,
    /// Dump the migration status for the current DB
    Status,
    /// Print the current version of the database
    Version,
    /// Creates new migration file with next version
    Create {
        name: String,
        #[arg(default_value = "sql")]
        kind: String,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse_from(legacy_flags(std::env::args_os()));

    if let Err(e) = run(args).await {
        die(&e);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => config::load_from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(dir) = args.dir {
        config.migrations.directory = dir;
    }

    let logging = config
        .logging
        .clone()
        .or_else(|| Some(LoggingConfig::default()));
    init_logging(&logging)?;

    let command = match args.command {
        Command::Create { name, kind } => {
            let path =
                migrations::create_migration(Path::new(&config.migrations.directory), &name, &kind)?;
            tracing::info!(path = %path.display(), "Created new migration file");
            return Ok(());
        }
        other => other,
    };

    let connection = connect_with(&config.database, args.attempts, &TracingSink).await?;
    let migrator = Migrator::new(&connection, &config.migrations)?;

    let result = match command {
        Command::Status => print_status(&migrator).await,
        Command::Version => migrator
            .version()
            .await
            .map(|version| println!("version {}", version)),
        Command::Up => migrator.run(MigrationCommand::Up).await.map(drop),
        Command::UpTo { version } => migrator.run(MigrationCommand::UpTo(version)).await.map(drop),
        Command::Down => migrator.run(MigrationCommand::Down).await.map(drop),
        Command::DownTo { version } => {
            migrator.run(MigrationCommand::DownTo(version)).await.map(drop)
        }
        Command::Redo => migrator.run(MigrationCommand::Redo).await.map(drop),
        Command::Reset => migrator.run(MigrationCommand::Reset).await.map(drop),
        // dispatched before connecting
        Command::Create { .. } => Ok(()),
    };

    connection.close().await;
    result
}

async fn print_status(migrator: &Migrator<'_>) -> Result<()> {
    println!("    Applied At                  Migration");
    println!("    =======================================");
    for status in migrator.status().await? {
        let applied = status
            .applied_at
            .map(|at| at.format("%a %b %e %H:%M:%S %Y").to_string())
            .unwrap_or_else(|| "Pending".to_string());
        println!("    {:<28}{}_{}", applied, status.version, status.name);
    }
    Ok(())
}

/// Rewrite the single-dash `-dir` spelling to `--dir`; clap would read it
/// as `-d ir`
fn legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-dir") => OsString::from("--dir"),
            Some(flag) if flag.starts_with("-dir=") => OsString::from(format!("-{}", flag)),
            _ => arg,
        })
        .collect()
}

fn die(err: &Error) -> ! {
    if let Some(db_err) = err.database_error() {
        eprintln!("{}", diagnostics::describe(db_err));
    }
    eprintln!("{}", err);
    std::process::exit(1);
}
