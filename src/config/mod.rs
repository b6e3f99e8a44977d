//! Experiment configuration
//!
//! One `ExperimentConfig` fully describes an active-learning run: which
//! classifier, sampler, and cluster strategy to use, the weak-labeling
//! thresholds, and the stopping criteria. Repeated runs of one configuration
//! are grouped by `param_list_id`, a digest over the hyperparameters that
//! ignores per-run bookkeeping (seed, core count, file paths).
//!
//! # Example
//!
//! ```ignore
//! use indagar::config::ExperimentConfig;
//! use indagar::sampling::SamplerKind;
//!
//! let config = ExperimentConfig::default()
//!     .with_sampling(SamplerKind::UncertaintyEntropy)
//!     .with_random_seed(7);
//! config.validate()?;
//! println!("group {}", config.param_list_id());
//! ```

mod cli;

pub use cli::{
    parse_args, ChartArgs, Cli, Command, CountArgs, DatasetsArgs, LatexArgs, MigrateArgs,
    ReportCommand, SearchArgs, SearchKind, StatsArgs, TableArgs,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::cluster::ClusterStrategy;
use crate::model::ClassifierKind;
use crate::sampling::SamplerKind;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("test_fraction must lie strictly between 0 and 1, got {0}")]
    TestFractionOutOfRange(f64),

    #[error("start_set_size must lie strictly between 0 and 1, got {0}")]
    StartSetSizeOutOfRange(f64),

    #[error("nr_queries_per_iteration must be at least 1")]
    ZeroQueriesPerIteration,

    #[error("{name} must lie in [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("uncertainty_recommendation_ratio must lie in (0, 1], got {0}")]
    RatioOutOfRange(f64),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Hyperparameters and bookkeeping for one active-learning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Directory holding `{name}.json` dataset files
    pub datasets_path: String,
    /// SQLite database path results are written to
    pub db_name_or_type: String,
    pub classifier: ClassifierKind,
    /// Worker threads for parallel trial evaluation
    pub cores: usize,
    pub test_fraction: f64,
    pub sampling: SamplerKind,
    pub random_seed: u64,
    pub cluster: ClusterStrategy,
    /// Upper bound on cycle iterations
    pub nr_learning_iterations: usize,
    /// Points labeled per oracle query
    pub nr_queries_per_iteration: usize,
    /// Seed-set share of the training split
    pub start_set_size: f64,
    pub with_uncertainty_recommendation: bool,
    pub with_cluster_recommendation: bool,
    /// Carried for storage compatibility; the engine rejects `true`
    pub with_snuba_lite: bool,
    /// Gate: no weak labels until test accuracy reaches this
    pub minimum_test_accuracy_before_recommendations: f64,
    pub uncertainty_recommendation_certainty_threshold: f64,
    /// Cap on certainty-recommended points, as a share of the unlabeled pool
    pub uncertainty_recommendation_ratio: f64,
    pub snuba_lite_minimum_heuristic_accuracy: f64,
    /// Majority-label share a cluster needs before its label is trusted
    pub cluster_recommendation_minimum_cluster_unity_size: f64,
    /// Labeled:unlabeled ratio a cluster needs before its label is trusted
    pub cluster_recommendation_ratio_labeled_unlabeled: f64,
    pub allow_recommendations_after_stop: bool,
    pub stopping_criteria_uncertainty: f64,
    pub stopping_criteria_acc: f64,
    pub stopping_criteria_std: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            datasets_path: "datasets".to_string(),
            db_name_or_type: "experiment_results.db".to_string(),
            classifier: ClassifierKind::NaiveBayes,
            cores: default_cores(),
            test_fraction: 0.5,
            sampling: SamplerKind::UncertaintyMaxMargin,
            random_seed: 42,
            cluster: ClusterStrategy::Dummy,
            nr_learning_iterations: 1_000_000,
            nr_queries_per_iteration: 150,
            start_set_size: 0.01,
            with_uncertainty_recommendation: false,
            with_cluster_recommendation: false,
            with_snuba_lite: false,
            minimum_test_accuracy_before_recommendations: 0.8,
            uncertainty_recommendation_certainty_threshold: 0.9,
            uncertainty_recommendation_ratio: 0.01,
            snuba_lite_minimum_heuristic_accuracy: 0.0,
            cluster_recommendation_minimum_cluster_unity_size: 0.8,
            cluster_recommendation_ratio_labeled_unlabeled: 0.8,
            allow_recommendations_after_stop: false,
            stopping_criteria_uncertainty: 0.0,
            stopping_criteria_acc: 1.0,
            stopping_criteria_std: 0.0,
        }
    }
}

fn default_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// The subset of fields hashed into `param_list_id`. Field order is part of
/// the id; reordering or renaming invalidates stored groupings.
#[derive(Serialize)]
struct GroupedParams<'a> {
    classifier: &'a ClassifierKind,
    test_fraction: f64,
    sampling: &'a SamplerKind,
    cluster: &'a ClusterStrategy,
    nr_learning_iterations: usize,
    nr_queries_per_iteration: usize,
    start_set_size: f64,
    with_uncertainty_recommendation: bool,
    with_cluster_recommendation: bool,
    with_snuba_lite: bool,
    minimum_test_accuracy_before_recommendations: f64,
    uncertainty_recommendation_certainty_threshold: f64,
    uncertainty_recommendation_ratio: f64,
    snuba_lite_minimum_heuristic_accuracy: f64,
    cluster_recommendation_minimum_cluster_unity_size: f64,
    cluster_recommendation_ratio_labeled_unlabeled: f64,
    allow_recommendations_after_stop: bool,
    stopping_criteria_uncertainty: f64,
    stopping_criteria_acc: f64,
    stopping_criteria_std: f64,
}

impl ExperimentConfig {
    pub fn with_classifier(mut self, classifier: ClassifierKind) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplerKind) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterStrategy) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_datasets_path(mut self, path: impl Into<String>) -> Self {
        self.datasets_path = path.into();
        self
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db_name_or_type = db.into();
        self
    }

    pub fn with_nr_queries_per_iteration(mut self, n: usize) -> Self {
        self.nr_queries_per_iteration = n;
        self
    }

    pub fn with_start_set_size(mut self, share: f64) -> Self {
        self.start_set_size = share;
        self
    }

    pub fn with_nr_learning_iterations(mut self, n: usize) -> Self {
        self.nr_learning_iterations = n;
        self
    }

    pub fn with_recommendations(mut self, uncertainty: bool, cluster: bool) -> Self {
        self.with_uncertainty_recommendation = uncertainty;
        self.with_cluster_recommendation = cluster;
        self
    }

    /// Check numeric ranges. Strategy names are typed and need no check.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::TestFractionOutOfRange(self.test_fraction));
        }
        if !(self.start_set_size > 0.0 && self.start_set_size < 1.0) {
            return Err(ConfigError::StartSetSizeOutOfRange(self.start_set_size));
        }
        if self.nr_queries_per_iteration == 0 {
            return Err(ConfigError::ZeroQueriesPerIteration);
        }

        let thresholds = [
            (
                "minimum_test_accuracy_before_recommendations",
                self.minimum_test_accuracy_before_recommendations,
            ),
            (
                "uncertainty_recommendation_certainty_threshold",
                self.uncertainty_recommendation_certainty_threshold,
            ),
            (
                "snuba_lite_minimum_heuristic_accuracy",
                self.snuba_lite_minimum_heuristic_accuracy,
            ),
            (
                "cluster_recommendation_minimum_cluster_unity_size",
                self.cluster_recommendation_minimum_cluster_unity_size,
            ),
            (
                "cluster_recommendation_ratio_labeled_unlabeled",
                self.cluster_recommendation_ratio_labeled_unlabeled,
            ),
            (
                "stopping_criteria_uncertainty",
                self.stopping_criteria_uncertainty,
            ),
            ("stopping_criteria_acc", self.stopping_criteria_acc),
            ("stopping_criteria_std", self.stopping_criteria_std),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        let ratio = self.uncertainty_recommendation_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::RatioOutOfRange(ratio));
        }

        Ok(())
    }

    /// Stable grouping key for repeated runs of one configuration.
    ///
    /// Lowercase hex SHA-256 over the hyperparameters; seed, core count, and
    /// file paths do not participate, so repeats with different seeds group
    /// together.
    pub fn param_list_id(&self) -> String {
        let grouped = GroupedParams {
            classifier: &self.classifier,
            test_fraction: self.test_fraction,
            sampling: &self.sampling,
            cluster: &self.cluster,
            nr_learning_iterations: self.nr_learning_iterations,
            nr_queries_per_iteration: self.nr_queries_per_iteration,
            start_set_size: self.start_set_size,
            with_uncertainty_recommendation: self.with_uncertainty_recommendation,
            with_cluster_recommendation: self.with_cluster_recommendation,
            with_snuba_lite: self.with_snuba_lite,
            minimum_test_accuracy_before_recommendations: self
                .minimum_test_accuracy_before_recommendations,
            uncertainty_recommendation_certainty_threshold: self
                .uncertainty_recommendation_certainty_threshold,
            uncertainty_recommendation_ratio: self.uncertainty_recommendation_ratio,
            snuba_lite_minimum_heuristic_accuracy: self.snuba_lite_minimum_heuristic_accuracy,
            cluster_recommendation_minimum_cluster_unity_size: self
                .cluster_recommendation_minimum_cluster_unity_size,
            cluster_recommendation_ratio_labeled_unlabeled: self
                .cluster_recommendation_ratio_labeled_unlabeled,
            allow_recommendations_after_stop: self.allow_recommendations_after_stop,
            stopping_criteria_uncertainty: self.stopping_criteria_uncertainty,
            stopping_criteria_acc: self.stopping_criteria_acc,
            stopping_criteria_std: self.stopping_criteria_std,
        };
        let encoded = serde_json::to_string(&grouped).unwrap_or_default();
        let digest = Sha256::digest(encoded.as_bytes());
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}
