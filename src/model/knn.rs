//! k-nearest-neighbors classifier

use ndarray::{Array2, ArrayView2};

use super::{argmax, Classifier, ModelError, Result};

/// Brute-force Euclidean kNN
///
/// Lazy learner: `fit` stores the training data, prediction votes among the k
/// nearest stored samples. When fewer than k samples are stored, all of them
/// vote. Equal distances break toward the lower sample index.
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    n_classes: usize,
    k: usize,
    x_train: Option<Array2<f64>>,
    y_train: Option<Vec<usize>>,
}

impl KNearestNeighbors {
    /// Create an untrained model covering `n_classes` probability columns
    pub fn new(n_classes: usize) -> Self {
        Self { n_classes, k: 5, x_train: None, y_train: None }
    }

    /// Override the neighbor count
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    fn neighbors(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Vec<usize>>> {
        let x_train = self.x_train.as_ref().ok_or(ModelError::NotFitted)?;
        let (n_samples, n_features) = x.dim();
        if n_features != x_train.ncols() {
            return Err(ModelError::DimensionMismatch {
                expected: x_train.ncols(),
                found: n_features,
            });
        }

        let k = self.k.min(x_train.nrows());
        let mut all = Vec::with_capacity(n_samples);
        for sample in 0..n_samples {
            let row = x.row(sample);
            let mut dists: Vec<(f64, usize)> = x_train
                .rows()
                .into_iter()
                .enumerate()
                .map(|(j, train_row)| {
                    let d = row
                        .iter()
                        .zip(train_row.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f64>();
                    (d, j)
                })
                .collect();
            dists.sort_by(|a, b| {
                a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1))
            });
            all.push(dists[..k].iter().map(|&(_, j)| j).collect());
        }
        Ok(all)
    }
}

impl Classifier for KNearestNeighbors {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<()> {
        let (n_samples, _) = x.dim();
        if n_samples == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if y.len() != n_samples {
            return Err(ModelError::SampleCountMismatch(n_samples, y.len()));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= self.n_classes) {
            return Err(ModelError::LabelOutOfRange(bad, self.n_classes));
        }

        self.x_train = Some(x.to_owned());
        self.y_train = Some(y.to_vec());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row.iter().copied())).collect())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let neighbors = self.neighbors(x)?;
        let y_train = self.y_train.as_ref().ok_or(ModelError::NotFitted)?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (sample, nearest) in neighbors.iter().enumerate() {
            let share = 1.0 / nearest.len() as f64;
            for &j in nearest {
                proba[[sample, y_train[j]]] += share;
            }
        }
        Ok(proba)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
