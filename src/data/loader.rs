//! JSON dataset files and label encoding

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::synthetic;
use super::{DataError, Result};

/// On-disk dataset shape: `{"features": [[...]], "labels": ["..."]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

/// Load the raw rows for `name`: the JSON file if present, else the built-in
/// synthetic fallback.
pub fn load_raw(datasets_path: &str, name: &str, seed: u64) -> Result<RawDataset> {
    let path = Path::new(datasets_path).join(format!("{name}.json"));
    if path.exists() {
        let contents = fs::read_to_string(&path)?;
        return Ok(serde_json::from_str(&contents)?);
    }
    synthetic::generate(name, seed)
}

/// Validate shapes and encode labels to contiguous ids sorted by class name.
pub fn encode(name: &str, raw: RawDataset) -> Result<(Array2<f64>, Vec<usize>, Vec<String>)> {
    if raw.features.is_empty() {
        return Err(DataError::EmptyDataset(name.to_string()));
    }
    if raw.features.len() != raw.labels.len() {
        return Err(DataError::LabelMismatch {
            rows: raw.features.len(),
            labels: raw.labels.len(),
        });
    }

    let n_features = raw.features[0].len();
    for (row, values) in raw.features.iter().enumerate() {
        if values.len() != n_features {
            return Err(DataError::RaggedFeatures {
                row,
                found: values.len(),
                expected: n_features,
            });
        }
    }

    let names: BTreeSet<&String> = raw.labels.iter().collect();
    let label_names: Vec<String> = names.into_iter().cloned().collect();
    let ids: BTreeMap<&str, usize> =
        label_names.iter().enumerate().map(|(id, name)| (name.as_str(), id)).collect();

    let labels: Vec<usize> = raw.labels.iter().map(|l| ids[l.as_str()]).collect();

    let flat: Vec<f64> = raw.features.into_iter().flatten().collect();
    let features = Array2::from_shape_vec((labels.len(), n_features), flat)
        .map_err(|_| DataError::EmptyDataset(name.to_string()))?;

    Ok((features, labels, label_names))
}

/// Write every built-in dataset as a JSON file under `datasets_path`.
///
/// Returns the written file paths. Existing files are overwritten so a changed
/// seed regenerates consistently.
pub fn write_builtin_datasets(datasets_path: &str, seed: u64) -> Result<Vec<String>> {
    fs::create_dir_all(datasets_path)?;
    let mut written = Vec::new();
    for &name in synthetic::BUILTIN_DATASETS {
        let raw = synthetic::generate(name, seed)?;
        let path = Path::new(datasets_path).join(format!("{name}.json"));
        fs::write(&path, serde_json::to_string(&raw)?)?;
        written.push(path.display().to_string());
    }
    Ok(written)
}
