//! Chance-rescaled global scores

use serde::Serialize;

use super::log::CycleMetrics;
use super::{CycleError, Result};

/// Weighted mean of `values`, rescaled so chance level maps to 0 and perfect
/// performance maps to 1.
///
/// With `L = n_classes` and weighted mean `m`, the score is
/// `(m - 1/L) / (1 - 1/L)`. A classifier guessing uniformly scores 0 on
/// accuracy-like metrics regardless of the class count.
pub fn global_score(values: &[f64], weights: &[f64], n_classes: usize) -> Result<f64> {
    if values.is_empty() {
        return Err(CycleError::EmptyValues);
    }
    if values.len() != weights.len() {
        return Err(CycleError::WeightMismatch(values.len(), weights.len()));
    }
    if n_classes < 2 {
        return Err(CycleError::TooFewClasses(n_classes));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(CycleError::NonPositiveWeight);
    }

    let mean = values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total;
    let chance = 1.0 / n_classes as f64;
    Ok((mean - chance) / (1.0 - chance))
}

/// The eight derived scores stored per run.
///
/// `with_weak` variants aggregate every iteration, `no_weak` only those whose
/// labels came from the seed or the oracle. Plain variants weight each
/// iteration by its query length, `_norm` variants by its log2, damping the
/// influence of large batches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DerivedScores {
    pub global_score_no_weak_roc_auc: f64,
    pub global_score_no_weak_acc: f64,
    pub global_score_with_weak_roc_auc: f64,
    pub global_score_with_weak_acc: f64,
    pub global_score_no_weak_roc_auc_norm: f64,
    pub global_score_no_weak_acc_norm: f64,
    pub global_score_with_weak_roc_auc_norm: f64,
    pub global_score_with_weak_acc_norm: f64,
}

impl DerivedScores {
    /// Compute all eight scores over a metric log
    pub fn from_metrics(metrics: &CycleMetrics, n_classes: usize) -> Result<Self> {
        let roc = &metrics.all_unlabeled_roc_auc_scores;
        let acc = metrics.test_accuracies();
        let weights: Vec<f64> = metrics.query_length.iter().map(|&q| q as f64).collect();
        let norm_weights: Vec<f64> = metrics
            .query_length
            .iter()
            .map(|&q| (q as f64).log2())
            .collect();

        let strong: Vec<usize> = metrics
            .recommendation
            .iter()
            .enumerate()
            .filter(|(_, source)| !source.is_weak())
            .map(|(index, _)| index)
            .collect();
        let pick = |series: &[f64]| -> Vec<f64> {
            strong.iter().map(|&index| series[index]).collect()
        };

        let strong_roc = pick(roc);
        let strong_acc = pick(&acc);
        let strong_weights = pick(&weights);
        let strong_norm = pick(&norm_weights);

        Ok(Self {
            global_score_no_weak_roc_auc: global_score(&strong_roc, &strong_weights, n_classes)?,
            global_score_no_weak_acc: global_score(&strong_acc, &strong_weights, n_classes)?,
            global_score_with_weak_roc_auc: global_score(roc, &weights, n_classes)?,
            global_score_with_weak_acc: global_score(&acc, &weights, n_classes)?,
            global_score_no_weak_roc_auc_norm: global_score(&strong_roc, &strong_norm, n_classes)?,
            global_score_no_weak_acc_norm: global_score(&strong_acc, &strong_norm, n_classes)?,
            global_score_with_weak_roc_auc_norm: global_score(roc, &norm_weights, n_classes)?,
            global_score_with_weak_acc_norm: global_score(&acc, &norm_weights, n_classes)?,
        })
    }

    /// The scalar fitness reported per trial to the search driver
    pub fn fit_score(&self) -> f64 {
        self.global_score_with_weak_acc
    }
}
