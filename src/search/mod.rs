//! Hyperparameter search over the cycle configuration
//!
//! Two drivers share one space, one estimator, and one trial bookkeeping
//! layer. Workers evaluate configurations in parallel; the database is only
//! ever touched from the driver thread.
//!
//! # Architecture
//!
//! - `space`: the fifteen searched dimensions, continuous and grid forms
//! - `estimator`: one configuration fitted across a dataset list
//! - `random`: independent uniform draws
//! - `evolutionary`: generational GA over index genomes
//! - `shim`: the one-fold splitter and its placeholder dataset name
//! - `trial`: per-trial state and the run outcome
//!
//! # Example
//!
//! ```ignore
//! use indagar::config::ExperimentConfig;
//! use indagar::search::RandomSearch;
//! use indagar::store::ResultStore;
//!
//! let store = ResultStore::open("results.db")?;
//! let outcome = RandomSearch::new(ExperimentConfig::default(), 50)
//!     .run(&["dwtc".to_string()], &store)?;
//! println!("best score {:.4}", outcome.best_score);
//! ```

mod estimator;
mod evolutionary;
mod random;
mod shim;
mod space;
mod trial;

pub use estimator::CycleEstimator;
pub use evolutionary::EvolutionarySearch;
pub use random::RandomSearch;
pub use shim::{with_placeholder, SingleFoldSplit, DATASET_PLACEHOLDER};
pub use space::{SearchSpace, SpaceMode};
pub use trial::{SearchOutcome, Trial, TrialStatus};

use thiserror::Error;

use crate::config::ExperimentConfig;
use crate::cycle::CycleError;
use crate::data::DataError;
use crate::store::StoreError;

/// Search driver errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Cannot score before fit")]
    EmptyScores,

    #[error("No trial completed; nothing to rank")]
    NoCompletedTrials,

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

fn thread_pool(cores: usize) -> Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new().num_threads(cores).build()?)
}

/// Best completed trial by score; failures carry no score and never win.
fn pick_best(trials: &[Trial]) -> Result<(ExperimentConfig, f64)> {
    trials
        .iter()
        .filter_map(|trial| trial.score.map(|score| (trial, score)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(trial, score)| (trial.config.clone(), score))
        .ok_or(SearchError::NoCompletedTrials)
}
