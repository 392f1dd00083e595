pub mod catalog;
pub mod config;
pub mod db {
    #[cfg(test)]
    pub mod memory;
    pub mod models;
    pub mod store;
}
pub mod schema;
pub mod utils;
pub mod workbook;
pub mod services {
    pub mod checksum;
    pub mod columns;
    pub mod discovery;
    pub mod header;
    pub mod importer;
    pub mod metadata;
    pub mod parse;
    pub mod rows;
}

use crate::config::Config;
use crate::db::store::{MonitoringStore, PgStore};
use crate::services::discovery::collect_files;
use crate::services::importer::{ImportStatus, Importer};
use clap::Parser;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// Import instrument-monitoring spreadsheets into PostgreSQL.
#[derive(Debug, Parser)]
#[command(name = "monitoring-import", version)]
struct Args {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Directory to scan for .xlsx/.xls files (defaults to DATA_ROOT)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Only re-import files whose earlier ingest recorded zero rows
    #[arg(long, conflicts_with = "dry_run")]
    retry_zero_rows: bool,

    /// Parse files and print what would be imported, without a database
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

fn dry_run(importer: &Importer, files: &[PathBuf]) -> Result<(), String> {
    let mut failed = 0usize;
    for path in files {
        match importer.parse_file(path) {
            Ok(parsed) => {
                let line = serde_json::to_string(&parsed.summary(path))
                    .map_err(|e| format!("serialize parse summary failed: {}", e))?;
                println!("{}", line);
            }
            Err(e) => {
                error!("Batch: {} failed to parse: {}", path.display(), e);
                failed += 1;
            }
        }
    }
    info!("Batch: dry run parsed {} file(s), {} failed", files.len() - failed, failed);
    if failed > 0 {
        return Err(format!("{} file(s) could not be parsed", failed));
    }
    Ok(())
}

fn import_all(importer: &Importer, store: &mut PgStore, files: &[PathBuf]) -> Result<(), String> {
    let (mut imported, mut skipped, mut failed, mut readings) = (0usize, 0usize, 0usize, 0usize);
    for path in files {
        match importer.import_file(store, path) {
            Ok(outcome) => {
                match outcome.status {
                    ImportStatus::Success => {
                        imported += 1;
                        readings += outcome.rows.unwrap_or(0);
                    }
                    ImportStatus::Skipped => skipped += 1,
                }
                let line = serde_json::to_string(&outcome)
                    .map_err(|e| format!("serialize import outcome failed: {}", e))?;
                println!("{}", line);
            }
            Err(e) => {
                error!("Batch: {} failed: {}", path.display(), e);
                failed += 1;
            }
        }
    }
    info!(
        "Batch: {} file(s) imported ({} readings), {} skipped, {} failed",
        imported, readings, skipped, failed
    );
    if failed > 0 {
        return Err(format!("{} of {} file(s) failed to import", failed, files.len()));
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), String> {
    // 1) Load config
    let mut cfg = Config::from_env()?;
    if let Some(root) = args.root.as_ref() {
        cfg.data_root = root.clone();
    }
    info!(
        "Config loaded (data_root={}, facility={}, section={}, batch_size={})",
        cfg.data_root.display(),
        cfg.site.facility_code,
        cfg.site.section_code,
        cfg.batch_size
    );
    let importer = Importer::from_config(&cfg);

    // 2) Dry run never touches the database
    if args.dry_run {
        let files = collect_files(&cfg.data_root)?;
        return dry_run(&importer, &files);
    }

    // 3) Connect DB and apply pending migrations
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");
    apply_database_migrations(&mut conn)?;
    let mut store = PgStore::new(conn);

    // 4) Pick the files to import
    let files = if args.retry_zero_rows {
        let paths = store
            .zero_row_ingest_paths()
            .map_err(|e| format!("listing zero-row ingest files failed: {}", e))?;
        info!("Batch: retrying {} file(s) that previously imported no rows", paths.len());
        paths.into_iter().map(PathBuf::from).collect()
    } else {
        collect_files(&cfg.data_root)?
    };
    if files.is_empty() {
        warn!("Batch: nothing to import under {}", cfg.data_root.display());
        return Ok(());
    }

    // 5) Import one file at a time
    import_all(&importer, &mut store, &files)
}

fn configure_env(env_file: Option<&Path>) -> Result<Option<LoadedEnvFile>, String> {
    // Values already present in the process environment are never overridden.
    if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        dotenvy::from_path(path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        return Ok(Some(LoadedEnvFile {
            path: path.to_path_buf(),
            explicit: true,
        }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        dotenvy::from_path(&default_path).map_err(|e| format!("failed to load {}: {}", default_path.display(), e))?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
        }))
    } else {
        Ok(None)
    }
}

fn main() {
    let args = Args::parse();
    let loaded_env = match configure_env(args.env_file.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "monitoring-import {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(&args) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
