//! Classification metrics
//!
//! Confusion matrix, sklearn-style classification report (serializable, the
//! shape stored in result rows and read back by the chart exporter), and
//! one-vs-rest ROC-AUC.

mod confusion;
mod report;
mod roc_auc;

pub use confusion::ConfusionMatrix;
pub use report::{ClassMetrics, ClassificationReport};
pub use roc_auc::roc_auc_score;

use thiserror::Error;

/// Metric computation errors
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Empty input")]
    EmptyInput,

    #[error("Length mismatch: {0} predictions vs {1} targets")]
    LengthMismatch(usize, usize),

    #[error("ROC-AUC undefined: every class is single-sided")]
    SingleClass,

    #[error("Probability matrix has {0} columns, expected {1}")]
    ClassCountMismatch(usize, usize),
}

/// Result type for metric operations
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Fraction of predictions equal to the target label.
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f64 {
    if y_pred.is_empty() {
        return 0.0;
    }
    let correct = y_pred.iter().zip(y_true.iter()).filter(|(p, t)| p == t).count();
    correct as f64 / y_pred.len() as f64
}
