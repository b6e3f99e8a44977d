//! Row type for the experiment result table

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::ExperimentConfig;
use crate::cycle::{CycleMetrics, CycleOutcome, DerivedScores};
use crate::metrics::{ClassificationReport, ConfusionMatrix};

/// One finished simulation of one configuration on one dataset.
///
/// Everything needed to reproduce the ranking and the charts is kept on the
/// row: the full hyperparameter set, the per-iteration metrics blob, and the
/// final evaluation of the trained model.
#[derive(Clone, Debug)]
pub struct ExperimentResult {
    pub config: ExperimentConfig,
    pub dataset_name: String,
    /// Per-iteration log, serialized into the `metrics_per_al_cycle` column
    pub metrics: CycleMetrics,
    pub amount_of_user_asked_queries: usize,
    pub experiment_run_date: DateTime<Utc>,
    pub fit_time: Duration,
    pub confusion_matrix_train: ConfusionMatrix,
    pub confusion_matrix_test: ConfusionMatrix,
    pub classification_report_train: ClassificationReport,
    pub classification_report_test: ClassificationReport,
    pub acc_train: f64,
    pub acc_test: f64,
    pub fit_score: f64,
    pub roc_auc: f64,
    /// Hash that groups repeated runs of the same hyperparameter set
    pub param_list_id: String,
    pub cv_fit_score_mean: Option<f64>,
    pub cv_fit_score_std: Option<f64>,
    pub thread_id: u64,
    pub end_time: DateTime<Utc>,
    pub scores: DerivedScores,
}

impl ExperimentResult {
    /// Assemble a row from a finished cycle.
    ///
    /// `experiment_run_date` is reconstructed from the wall time so that the
    /// stored interval matches the simulation even when the row is built
    /// after the fact.
    pub fn from_outcome(
        config: &ExperimentConfig,
        dataset_name: &str,
        outcome: CycleOutcome,
        thread_id: u64,
    ) -> Self {
        let end_time = Utc::now();
        let experiment_run_date = match chrono::Duration::from_std(outcome.fit_time) {
            Ok(elapsed) => end_time - elapsed,
            Err(_) => end_time,
        };
        Self {
            config: config.clone(),
            dataset_name: dataset_name.to_string(),
            metrics: outcome.metrics,
            amount_of_user_asked_queries: outcome.amount_of_user_asked_queries,
            experiment_run_date,
            fit_time: outcome.fit_time,
            confusion_matrix_train: outcome.confusion_matrix_train,
            confusion_matrix_test: outcome.confusion_matrix_test,
            classification_report_train: outcome.classification_report_train,
            classification_report_test: outcome.classification_report_test,
            acc_train: outcome.acc_train,
            acc_test: outcome.acc_test,
            fit_score: outcome.fit_score,
            roc_auc: outcome.roc_auc,
            param_list_id: config.param_list_id(),
            cv_fit_score_mean: None,
            cv_fit_score_std: None,
            thread_id,
            end_time,
            scores: outcome.scores,
        }
    }

    /// Stamp the across-dataset statistics once the whole trial is scored
    pub fn with_cv_stats(mut self, mean: f64, std: f64) -> Self {
        self.cv_fit_score_mean = Some(mean);
        self.cv_fit_score_std = Some(std);
        self
    }
}
