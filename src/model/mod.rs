//! Classifiers for the active-learning cycle
//!
//! The cycle retrains from scratch on every labeled-pool snapshot, so both
//! implementations are cheap-to-fit batch learners. Probability columns always
//! cover the dataset's full class set, even when a class is missing from the
//! current pool; its column is simply zero.

mod knn;
mod naive_bayes;

pub use knn::KNearestNeighbors;
pub use naive_bayes::GaussianNaiveBayes;

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Sample count mismatch: {0} rows vs {1} labels")]
    SampleCountMismatch(usize, usize),

    #[error("Feature dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Label {0} out of range for {1} classes")]
    LabelOutOfRange(usize, usize),

    #[error("Model not fitted")]
    NotFitted,

    #[error("Unknown classifier: {0}")]
    UnknownClassifier(String),
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// A classifier over dense feature matrices with calibrated-ish probabilities
pub trait Classifier: Send {
    /// Train on the given samples; replaces any previous fit
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<()>;

    /// Predict class ids (argmax of `predict_proba`, smaller id wins ties)
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>>;

    /// Per-sample class probabilities; shape (n_samples, n_classes), rows sum to 1
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Number of classes the probability columns cover
    fn n_classes(&self) -> usize;
}

/// Selectable classifier family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    NaiveBayes,
    Knn,
}

impl ClassifierKind {
    /// Construct a fresh untrained classifier for the given class count
    pub fn build(&self, n_classes: usize) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::NaiveBayes => Box::new(GaussianNaiveBayes::new(n_classes)),
            ClassifierKind::Knn => Box::new(KNearestNeighbors::new(n_classes)),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::NaiveBayes => write!(f, "naive_bayes"),
            ClassifierKind::Knn => write!(f, "knn"),
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "naive_bayes" => Ok(ClassifierKind::NaiveBayes),
            "knn" => Ok(ClassifierKind::Knn),
            other => Err(ModelError::UnknownClassifier(other.to_string())),
        }
    }
}

/// Argmax over one probability row, smaller class id wins ties
pub(crate) fn argmax<I>(row: I) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let mut best = 0;
    let mut best_p = f64::NEG_INFINITY;
    for (class, p) in row.into_iter().enumerate() {
        if p > best_p {
            best = class;
            best_p = p;
        }
    }
    best
}
