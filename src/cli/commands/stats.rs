//! Stats command implementation

use crate::cli::LogLevel;
use crate::config::StatsArgs;
use crate::report::stats_table;
use crate::store::ResultStore;

pub fn run_stats(args: StatsArgs, _level: LogLevel) -> Result<(), String> {
    let store = ResultStore::open(&args.db).map_err(|e| format!("Store error: {e}"))?;
    let runs = store.top_by_fit_score(args.top).map_err(|e| e.to_string())?;
    if runs.is_empty() {
        println!("no stored runs");
        return Ok(());
    }
    let table = stats_table(&runs).map_err(|e| e.to_string())?;
    println!("{table}");
    Ok(())
}
