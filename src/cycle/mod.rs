//! Active-learning cycle engine
//!
//! Simulates one run for a (dataset, configuration) pair: train on the
//! labeled pool, evaluate, then either accept weak labels or ask the oracle,
//! until a stopping criterion fires or the pool runs dry. Each iteration
//! appends one entry to the metric log that is stored per run as the
//! `metrics_per_al_cycle` blob.
//!
//! # Architecture
//!
//! - `engine`: the simulation loop (`run_cycle`)
//! - `recommend`: weak-label recommenders (cluster unity, model certainty)
//! - `stopping`: windowed stopping criteria
//! - `log`: the per-iteration metric log
//! - `score`: chance-rescaled global scores over the log
//!
//! # Example
//!
//! ```ignore
//! use indagar::config::ExperimentConfig;
//! use indagar::cycle::run_cycle;
//! use indagar::data::load_dataset;
//!
//! let dataset = load_dataset("datasets", "dwtc", 0.5, 42)?;
//! let outcome = run_cycle(&dataset, &ExperimentConfig::default(), 42)?;
//! println!("asked the oracle {} times", outcome.amount_of_user_asked_queries);
//! ```

mod engine;
mod log;
mod recommend;
mod score;
mod stopping;

pub use engine::{run_cycle, CycleOutcome};
pub use log::CycleMetrics;
pub use recommend::Recommendation;
pub use score::{global_score, DerivedScores};
pub use stopping::StoppingState;

use thiserror::Error;

use crate::cluster::ClusterError;
use crate::config::ConfigError;
use crate::data::DataError;
use crate::metrics::MetricsError;
use crate::model::ModelError;
use crate::sampling::SamplingError;

/// Cycle simulation errors
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("with_snuba_lite is not supported")]
    SnubaLiteUnsupported,

    #[error("Need at least 2 classes, got {0}")]
    TooFewClasses(usize),

    #[error("Cannot score an empty value series")]
    EmptyValues,

    #[error("Value and weight counts differ: {0} vs {1}")]
    WeightMismatch(usize, usize),

    #[error("Total weight must be positive")]
    NonPositiveWeight,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Clustering error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),
}

/// Result type for cycle operations
pub type Result<T> = std::result::Result<T, CycleError>;
