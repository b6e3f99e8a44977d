//! Migrate command implementation

use std::path::Path;

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::MigrateArgs;
use crate::store::{migrate_global_scores, ResultStore};

pub fn run_migrate(args: MigrateArgs, level: LogLevel) -> Result<(), String> {
    if !Path::new(&args.db).exists() {
        return Err(format!("Database {} does not exist", args.db));
    }

    let mut store =
        ResultStore::open_existing(&args.db).map_err(|e| format!("Store error: {e}"))?;
    let migrated =
        migrate_global_scores(&mut store).map_err(|e| format!("Migration failed: {e}"))?;
    log(level, LogLevel::Normal, &format!("backfilled {migrated} rows in {}", args.db));
    Ok(())
}
