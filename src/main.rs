//! indagar CLI
//!
//! Hyperparameter search over simulated active-learning cycles.
//!
//! # Usage
//!
//! ```bash
//! # Random search over the built-in datasets
//! indagar search --nr-random-runs 100 --db results.db
//!
//! # Evolutionary search
//! indagar search --hyper-search-type evo --population-size 20 --generations-number 10
//!
//! # Aggregate stored results
//! indagar report count --db results.db
//! indagar report table --db results.db --top 5
//! indagar report latex --db results.db --destination ranking.tex
//! indagar report chart --db results.db --dataset dwtc --destination chart.json
//! indagar stats --db results.db
//!
//! # Backfill the derived scores on a database from before they existed
//! indagar migrate --db old_results.db
//!
//! # Materialize the built-in demo datasets
//! indagar datasets --datasets-path datasets
//! ```

use clap::Parser;
use indagar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
