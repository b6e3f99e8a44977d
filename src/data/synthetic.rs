//! Deterministic synthetic datasets
//!
//! Gaussian blobs, one blob per class per center, used when no dataset file
//! exists for one of the built-in names. Generation is a pure function of
//! (name, seed).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use super::loader::RawDataset;
use super::{DataError, Result};

/// Names with a synthetic fallback
pub const BUILTIN_DATASETS: &[&str] =
    &["dwtc", "ibn_sina", "hiva", "orange", "sylva", "forest_covtype", "zebra"];

struct Profile {
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    spread: f64,
}

fn profile(name: &str) -> Option<Profile> {
    let (n_samples, n_features, n_classes, spread) = match name {
        "dwtc" => (800, 8, 5, 1.2),
        "ibn_sina" => (600, 6, 2, 1.0),
        "hiva" => (500, 10, 2, 1.4),
        "orange" => (400, 6, 2, 1.1),
        "sylva" => (700, 8, 2, 0.9),
        "forest_covtype" => (900, 10, 7, 1.3),
        "zebra" => (500, 8, 2, 1.2),
        _ => return None,
    };
    Some(Profile { n_samples, n_features, n_classes, spread })
}

/// Generate the synthetic rows for a built-in name.
pub fn generate(name: &str, seed: u64) -> Result<RawDataset> {
    let profile = profile(name).ok_or_else(|| DataError::UnknownDataset(name.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed ^ name_hash(name));

    // Well-separated class centers
    let mut centers = vec![vec![0.0; profile.n_features]; profile.n_classes];
    for center in centers.iter_mut() {
        for value in center.iter_mut() {
            *value = rng.random_range(-10.0..10.0);
        }
    }

    let mut features = Vec::with_capacity(profile.n_samples);
    let mut labels = Vec::with_capacity(profile.n_samples);
    for i in 0..profile.n_samples {
        let class = i % profile.n_classes;
        let row: Vec<f64> = centers[class]
            .iter()
            .map(|&c| c + profile.spread * standard_normal(&mut rng))
            .collect();
        features.push(row);
        labels.push(format!("class_{class}"));
    }

    Ok(RawDataset { features, labels })
}

fn name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    u64::from_le_bytes(digest[..8].try_into().unwrap_or([0; 8]))
}

fn standard_normal(rng: &mut StdRng) -> f64 {
    // Box-Muller transform
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
