//! Labeled/unlabeled pool bookkeeping
//!
//! The training split starts unlabeled; the cycle moves indices into the
//! labeled pool exactly once, each with an assigned label (which may disagree
//! with ground truth for weak sources) and a provenance tag.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{DataError, Result};

/// Provenance of a labeled point, serialized as the one-letter tag stored in
/// the per-iteration metric log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSource {
    /// Seed set labeled from ground truth before the first iteration
    #[serde(rename = "G")]
    GroundTruth,
    /// Oracle answer to an explicit query
    #[serde(rename = "A")]
    Oracle,
    /// Weak label propagated from a unified cluster
    #[serde(rename = "C")]
    WeakCluster,
    /// Weak label accepted on high classifier certainty
    #[serde(rename = "U")]
    WeakCertainty,
}

impl LabelSource {
    /// True for the two weak (unconfirmed) sources
    pub fn is_weak(&self) -> bool {
        matches!(self, LabelSource::WeakCluster | LabelSource::WeakCertainty)
    }

    /// Human-readable name used in chart legends
    pub fn display_name(&self) -> &'static str {
        match self {
            LabelSource::GroundTruth => "Ground Truth",
            LabelSource::Oracle => "Oracle",
            LabelSource::WeakCluster => "Weak Cluster",
            LabelSource::WeakCertainty => "Weak Certainty",
        }
    }
}

/// One labeled training point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabeledPoint {
    /// Row index into the training matrix
    pub index: usize,
    /// Label the cycle assigned (weak sources may be wrong)
    pub label: usize,
    /// Ground-truth label, kept for strong-accuracy bookkeeping
    pub true_label: usize,
    pub source: LabelSource,
}

/// Labeled and unlabeled index pools over one training split
#[derive(Clone, Debug)]
pub struct PoolSet {
    labeled: Vec<LabeledPoint>,
    /// Sorted remaining indices
    unlabeled: Vec<usize>,
}

impl PoolSet {
    /// All `n_train` indices start unlabeled
    pub fn new(n_train: usize) -> Self {
        Self { labeled: Vec::new(), unlabeled: (0..n_train).collect() }
    }

    pub fn labeled(&self) -> &[LabeledPoint] {
        &self.labeled
    }

    pub fn unlabeled(&self) -> &[usize] {
        &self.unlabeled
    }

    pub fn n_labeled(&self) -> usize {
        self.labeled.len()
    }

    pub fn n_unlabeled(&self) -> usize {
        self.unlabeled.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.unlabeled.is_empty()
    }

    /// Whether an index is still unlabeled
    pub fn is_unlabeled(&self, index: usize) -> bool {
        self.unlabeled.binary_search(&index).is_ok()
    }

    /// Move a batch of points into the labeled pool.
    ///
    /// `assignments` pairs a training index with its assigned label. Every
    /// index must currently be unlabeled; on success returns the batch size.
    pub fn label_batch(
        &mut self,
        assignments: &[(usize, usize)],
        y_true: &[usize],
        source: LabelSource,
    ) -> Result<usize> {
        for &(index, _) in assignments {
            if !self.is_unlabeled(index) {
                return Err(DataError::NotUnlabeled(index));
            }
        }

        for &(index, label) in assignments {
            self.labeled.push(LabeledPoint {
                index,
                label,
                true_label: y_true[index],
                source,
            });
        }
        let removed: std::collections::BTreeSet<usize> =
            assignments.iter().map(|&(index, _)| index).collect();
        self.unlabeled.retain(|index| !removed.contains(index));

        Ok(assignments.len())
    }

    /// Materialize the labeled pool as a training matrix and assigned labels
    pub fn labeled_xy(&self, x: ArrayView2<'_, f64>) -> (Array2<f64>, Vec<usize>) {
        let mut out = Array2::zeros((self.labeled.len(), x.ncols()));
        let mut y = Vec::with_capacity(self.labeled.len());
        for (row, point) in self.labeled.iter().enumerate() {
            out.row_mut(row).assign(&x.row(point.index));
            y.push(point.label);
        }
        (out, y)
    }

    /// Materialize the unlabeled pool as a matrix (row order = pool order)
    pub fn unlabeled_x(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = Array2::zeros((self.unlabeled.len(), x.ncols()));
        for (row, &index) in self.unlabeled.iter().enumerate() {
            out.row_mut(row).assign(&x.row(index));
        }
        out
    }

    /// Ground-truth labels of the unlabeled pool (for evaluation only)
    pub fn unlabeled_y_true(&self, y_true: &[usize]) -> Vec<usize> {
        self.unlabeled.iter().map(|&index| y_true[index]).collect()
    }
}
