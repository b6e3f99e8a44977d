//! Confusion matrix for multi-class classification

use std::fmt;

use super::{MetricsError, Result};

/// Confusion matrix for multi-class classification
///
/// Element [i][j] counts samples with true label i predicted as j. The class
/// count is fixed up front so matrices from different pool snapshots of one
/// dataset stay comparable even when a class is absent from a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Create an empty matrix for a known number of classes
    pub fn new(n_classes: usize) -> Self {
        Self { matrix: vec![vec![0; n_classes]; n_classes], n_classes }
    }

    /// Build from predictions and ground truth over a known class count
    pub fn from_predictions(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Result<Self> {
        if y_pred.len() != y_true.len() {
            return Err(MetricsError::LengthMismatch(y_pred.len(), y_true.len()));
        }

        let mut cm = Self::new(n_classes);
        for (&pred, &truth) in y_pred.iter().zip(y_true.iter()) {
            if pred < n_classes && truth < n_classes {
                cm.matrix[truth][pred] += 1;
            }
        }
        Ok(cm)
    }

    /// Rebuild from stored rows (the JSON form persisted per run)
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Self {
        let n_classes = rows.len();
        Self { matrix: rows, n_classes }
    }

    /// The raw count rows: matrix[true_label][predicted_label]
    pub fn rows(&self) -> &Vec<Vec<usize>> {
        &self.matrix
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Count at [true_label][predicted_label]
    pub fn get(&self, true_label: usize, predicted_label: usize) -> usize {
        self.matrix[true_label][predicted_label]
    }

    /// True positives for a class
    pub fn true_positives(&self, class: usize) -> usize {
        self.matrix[class][class]
    }

    /// False positives for a class (predicted as class but wasn't)
    pub fn false_positives(&self, class: usize) -> usize {
        (0..self.n_classes).filter(|&i| i != class).map(|i| self.matrix[i][class]).sum()
    }

    /// False negatives for a class (was class but predicted differently)
    pub fn false_negatives(&self, class: usize) -> usize {
        (0..self.n_classes).filter(|&j| j != class).map(|j| self.matrix[class][j]).sum()
    }

    /// Support (total true instances) for a class
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        correct as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confusion Matrix:")?;

        write!(f, "      ")?;
        for j in 0..self.n_classes {
            write!(f, "Pred {j} ")?;
        }
        writeln!(f)?;

        for i in 0..self.n_classes {
            write!(f, "True {i}")?;
            for j in 0..self.n_classes {
                write!(f, "{:>6} ", self.matrix[i][j])?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
