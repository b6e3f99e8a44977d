//! Indagar: active-learning experimentation
//!
//! Simulates active-learning cycles for classification (train on a growing
//! labeled pool, query an oracle, optionally accept weak labels from cluster
//! or certainty heuristics), sweeps the cycle's hyperparameters with random or
//! evolutionary search, persists one result row per (dataset, configuration)
//! run in SQLite, and aggregates/ranks/visualizes the stored results.
//!
//! ## Architecture
//!
//! - `data`: dataset loading (JSON or built-in synthetic), train/test split,
//!   labeled/unlabeled pool bookkeeping
//! - `model`: the `Classifier` trait with Gaussian naive Bayes and kNN
//! - `metrics`: confusion matrix, classification report, ROC-AUC
//! - `sampling` / `cluster`: oracle-query ranking and cluster restriction
//! - `cycle`: the per-(dataset, configuration) simulation engine
//! - `search`: hyperparameter space, degenerate CV shim, estimator adapter,
//!   random and evolutionary drivers
//! - `store`: SQLite result persistence and the derived-score migration
//! - `report`: ranking, LaTeX table export, Vega-Lite chart export
//! - `cli` / `config`: command surface and experiment configuration
//!
//! ## Example
//!
//! ```ignore
//! use indagar::config::ExperimentConfig;
//! use indagar::cycle::run_cycle;
//! use indagar::data::load_dataset;
//!
//! let dataset = load_dataset("datasets", "dwtc", 0.5, 42)?;
//! let config = ExperimentConfig::builder("dwtc").build();
//! let outcome = run_cycle(&dataset, &config, 42)?;
//! println!("fit score: {:.4}", outcome.fit_score);
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod cycle;
pub mod data;
pub mod metrics;
pub mod model;
pub mod report;
pub mod sampling;
pub mod search;
pub mod store;

pub use config::ExperimentConfig;
pub use cycle::{run_cycle, CycleOutcome};
pub use data::{load_dataset, Dataset};
pub use search::{EvolutionarySearch, RandomSearch, SearchOutcome};
pub use store::ResultStore;
