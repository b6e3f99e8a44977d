//! Datasets command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::DatasetsArgs;
use crate::data::write_builtin_datasets;

pub fn run_datasets(args: DatasetsArgs, level: LogLevel) -> Result<(), String> {
    let written = write_builtin_datasets(&args.datasets_path, args.random_seed)
        .map_err(|e| format!("Dataset write failed: {e}"))?;
    for path in &written {
        log(level, LogLevel::Normal, &format!("wrote {path}"));
    }
    Ok(())
}
