//! Per-iteration metric log
//!
//! Five parallel arrays, one entry per cycle iteration. The log is the
//! durable record of a run: it is serialized into the `metrics_per_al_cycle`
//! column and read back by the migration backfill and the chart exporter.

use serde::{Deserialize, Serialize};

use crate::data::LabelSource;
use crate::metrics::ClassificationReport;

/// Parallel per-iteration arrays
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleMetrics {
    /// Label source of each iteration's batch
    pub recommendation: Vec<LabelSource>,
    /// Points labeled per iteration
    pub query_length: Vec<usize>,
    /// Share of assigned labels matching ground truth
    pub query_strong_accuracy_list: Vec<f64>,
    /// ROC-AUC series: on the unlabeled pool while it lasts, then on test
    pub all_unlabeled_roc_auc_scores: Vec<f64>,
    /// Test-split classification report per iteration
    pub test_data_metrics: Vec<ClassificationReport>,
}

impl CycleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one iteration
    pub fn push(
        &mut self,
        source: LabelSource,
        query_length: usize,
        strong_accuracy: f64,
        roc_auc: f64,
        test_report: ClassificationReport,
    ) {
        self.recommendation.push(source);
        self.query_length.push(query_length);
        self.query_strong_accuracy_list.push(strong_accuracy);
        self.all_unlabeled_roc_auc_scores.push(roc_auc);
        self.test_data_metrics.push(test_report);
    }

    pub fn len(&self) -> usize {
        self.recommendation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recommendation.is_empty()
    }

    /// Whether all five arrays have equal length
    pub fn is_consistent(&self) -> bool {
        let n = self.recommendation.len();
        self.query_length.len() == n
            && self.query_strong_accuracy_list.len() == n
            && self.all_unlabeled_roc_auc_scores.len() == n
            && self.test_data_metrics.len() == n
    }

    /// Test accuracy series, one value per iteration
    pub fn test_accuracies(&self) -> Vec<f64> {
        self.test_data_metrics
            .iter()
            .map(|report| report.accuracy)
            .collect()
    }

    /// Total points the oracle was asked for
    pub fn oracle_query_total(&self) -> usize {
        self.recommendation
            .iter()
            .zip(&self.query_length)
            .filter(|(source, _)| **source == LabelSource::Oracle)
            .map(|(_, &length)| length)
            .sum()
    }

    /// Iterations whose batch came from the given source
    pub fn count_source(&self, source: LabelSource) -> usize {
        self.recommendation
            .iter()
            .filter(|&&entry| entry == source)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ClassificationReport;

    fn perfect_report() -> ClassificationReport {
        ClassificationReport::from_predictions(&[0, 1], &[0, 1], 2).expect("report")
    }

    fn sample() -> CycleMetrics {
        let mut metrics = CycleMetrics::new();
        metrics.push(LabelSource::GroundTruth, 4, 1.0, 0.5, perfect_report());
        metrics.push(LabelSource::Oracle, 10, 1.0, 0.8, perfect_report());
        metrics.push(LabelSource::WeakCertainty, 3, 0.9, 0.85, perfect_report());
        metrics.push(LabelSource::Oracle, 10, 1.0, 0.95, perfect_report());
        metrics
    }

    #[test]
    fn test_push_keeps_arrays_parallel() {
        let metrics = sample();
        assert_eq!(metrics.len(), 4);
        assert!(metrics.is_consistent());
    }

    #[test]
    fn test_oracle_query_total() {
        assert_eq!(sample().oracle_query_total(), 20);
    }

    #[test]
    fn test_count_source() {
        let metrics = sample();
        assert_eq!(metrics.count_source(LabelSource::Oracle), 2);
        assert_eq!(metrics.count_source(LabelSource::WeakCertainty), 1);
        assert_eq!(metrics.count_source(LabelSource::WeakCluster), 0);
    }

    #[test]
    fn test_blob_shape() {
        let encoded = serde_json::to_value(sample()).expect("encode");
        assert_eq!(
            encoded["recommendation"],
            serde_json::json!(["G", "A", "U", "A"])
        );
        assert_eq!(encoded["query_length"][1], 10);
        assert!(encoded["test_data_metrics"][0]["weighted avg"]["f1-score"].is_number());
    }

    #[test]
    fn test_blob_roundtrip() {
        let metrics = sample();
        let encoded = serde_json::to_string(&metrics).expect("encode");
        let decoded: CycleMetrics = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, metrics);
    }
}
