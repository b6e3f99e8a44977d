//! Dataset access and pool bookkeeping
//!
//! Datasets load from `{datasets_path}/{name}.json`; the built-in demo names
//! fall back to deterministic synthetic generation when no file exists. The
//! split is seeded, so one (datasets_path, name, test_fraction, seed) tuple
//! always yields the same train/test partition.

mod loader;
mod pool;
mod synthetic;

pub use loader::{write_builtin_datasets, RawDataset};
pub use pool::{LabelSource, LabeledPoint, PoolSet};
pub use synthetic::BUILTIN_DATASETS;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Dataset errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dataset file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Dataset {0} is empty")]
    EmptyDataset(String),

    #[error("Ragged feature rows: row {row} has {found} values, expected {expected}")]
    RaggedFeatures { row: usize, found: usize, expected: usize },

    #[error("Row/label count mismatch: {rows} rows vs {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("test_fraction {0} outside (0, 1)")]
    TestFractionOutOfRange(f64),

    #[error("Dataset {0} needs at least 2 rows to split")]
    TooFewRows(String),

    #[error("Point {0} is not in the unlabeled pool")]
    NotUnlabeled(usize),
}

/// Result type for data operations
pub type Result<T> = std::result::Result<T, DataError>;

/// A loaded, encoded, split dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub x_train: Array2<f64>,
    pub y_train: Vec<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Vec<usize>,
    /// Encoded class names, index = class id
    pub label_names: Vec<String>,
}

impl Dataset {
    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.label_names.len()
    }

    /// Feature dimensionality
    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}

/// Load, encode, and split one dataset.
pub fn load_dataset(
    datasets_path: &str,
    name: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<Dataset> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DataError::TestFractionOutOfRange(test_fraction));
    }

    let raw = loader::load_raw(datasets_path, name, seed)?;
    let (features, labels, label_names) = loader::encode(name, raw)?;

    let n = features.nrows();
    if n < 2 {
        return Err(DataError::TooFewRows(name.to_string()));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let take = |idx: &[usize]| -> (Array2<f64>, Vec<usize>) {
        let mut x = Array2::zeros((idx.len(), features.ncols()));
        let mut y = Vec::with_capacity(idx.len());
        for (row, &i) in idx.iter().enumerate() {
            x.row_mut(row).assign(&features.row(i));
            y.push(labels[i]);
        }
        (x, y)
    };

    let (x_test, y_test) = take(test_idx);
    let (x_train, y_train) = take(train_idx);

    Ok(Dataset { name: name.to_string(), x_train, y_train, x_test, y_test, label_names })
}
