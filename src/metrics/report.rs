//! Serializable classification report

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::confusion::ConfusionMatrix;
use super::Result;

/// Precision/recall/F1/support for one class or one average row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: f64,
}

/// Classification report in the sklearn dict shape
///
/// Serializes to `{"0": {...}, "1": {...}, "accuracy": a, "macro avg": {...},
/// "weighted avg": {...}}`, the form stored in result rows and consumed by
/// the chart exporter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(flatten)]
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build a report from predictions and ground truth
    pub fn from_predictions(
        y_pred: &[usize],
        y_true: &[usize],
        n_classes: usize,
    ) -> Result<Self> {
        let cm = ConfusionMatrix::from_predictions(y_pred, y_true, n_classes)?;
        Ok(Self::from_confusion_matrix(&cm))
    }

    /// Build a report from an already-computed confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix) -> Self {
        let n_classes = cm.n_classes();
        let mut classes = BTreeMap::new();
        let mut precisions = Vec::with_capacity(n_classes);
        let mut recalls = Vec::with_capacity(n_classes);
        let mut f1s = Vec::with_capacity(n_classes);
        let mut supports = Vec::with_capacity(n_classes);

        for class in 0..n_classes {
            let tp = cm.true_positives(class) as f64;
            let fp = cm.false_positives(class) as f64;
            let fn_ = cm.false_negatives(class) as f64;

            let p = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
            let r = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
            let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
            let s = cm.support(class) as f64;

            precisions.push(p);
            recalls.push(r);
            f1s.push(f);
            supports.push(s);

            classes.insert(
                class.to_string(),
                ClassMetrics { precision: p, recall: r, f1_score: f, support: s },
            );
        }

        let total_support: f64 = supports.iter().sum();
        let macro_avg = ClassMetrics {
            precision: mean(&precisions),
            recall: mean(&recalls),
            f1_score: mean(&f1s),
            support: total_support,
        };
        let weighted_avg = ClassMetrics {
            precision: weighted_mean(&precisions, &supports),
            recall: weighted_mean(&recalls, &supports),
            f1_score: weighted_mean(&f1s, &supports),
            support: total_support,
        };

        Self { classes, accuracy: cm.accuracy(), macro_avg, weighted_avg }
    }

    /// Number of class rows in the report
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum::<f64>() / total
}
