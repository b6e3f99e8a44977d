//! Cluster strategies for oracle queries
//!
//! A k-means partition of the training features is computed once per cycle;
//! each iteration a strategy narrows the oracle query to one cluster (or
//! declines to narrow). Weak cluster recommendation reads the same partition.

mod kmeans;

pub use kmeans::KMeans;

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sampling::{entropy_uncertainty, least_confidence, margin_uncertainty};

/// Clustering errors
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Cannot cluster an empty matrix")]
    EmptyInput,

    #[error("Invalid cluster count {k} for {n_samples} samples")]
    InvalidK { k: usize, n_samples: usize },

    #[error("Unknown cluster strategy: {0}")]
    UnknownStrategy(String),
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Selectable cluster strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// No restriction, the sampler sees the whole pool
    Dummy,
    /// One uniformly chosen cluster per iteration
    Random,
    /// The cluster with the highest mean least-confidence uncertainty
    MostUncertainLc,
    /// The cluster with the highest mean margin uncertainty
    MostUncertainMaxMargin,
    /// The cluster with the highest mean entropy uncertainty
    MostUncertainEntropy,
    /// Clusters visited cyclically by iteration index
    RoundRobin,
}

impl fmt::Display for ClusterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusterStrategy::Dummy => "dummy",
            ClusterStrategy::Random => "random",
            ClusterStrategy::MostUncertainLc => "most_uncertain_lc",
            ClusterStrategy::MostUncertainMaxMargin => "most_uncertain_max_margin",
            ClusterStrategy::MostUncertainEntropy => "most_uncertain_entropy",
            ClusterStrategy::RoundRobin => "round_robin",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ClusterStrategy {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dummy" => Ok(ClusterStrategy::Dummy),
            "random" => Ok(ClusterStrategy::Random),
            "most_uncertain_lc" => Ok(ClusterStrategy::MostUncertainLc),
            "most_uncertain_max_margin" => Ok(ClusterStrategy::MostUncertainMaxMargin),
            "most_uncertain_entropy" => Ok(ClusterStrategy::MostUncertainEntropy),
            "round_robin" => Ok(ClusterStrategy::RoundRobin),
            other => Err(ClusterError::UnknownStrategy(other.to_string())),
        }
    }
}

/// The per-cycle k-means partition
#[derive(Debug, Clone)]
pub struct ClusterContext {
    /// Cluster id per training row
    assignments: Vec<usize>,
    k: usize,
}

impl ClusterContext {
    /// Partition the training features into `k` clusters
    pub fn build(x_train: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<Self> {
        let k = k.min(x_train.nrows()).max(1);
        let assignments = KMeans::new(k).with_seed(seed).fit_predict(x_train)?;
        Ok(Self { assignments, k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Cluster id of a training row
    pub fn cluster_of(&self, index: usize) -> usize {
        self.assignments[index]
    }

    /// Narrow the candidate set for one oracle query.
    ///
    /// `unlabeled` are training indices in pool order, `proba` their current
    /// class probabilities (same order). Returns positions into `unlabeled`.
    /// An empty chosen cluster falls back to the whole pool.
    pub fn candidates(
        &self,
        strategy: ClusterStrategy,
        unlabeled: &[usize],
        proba: ArrayView2<'_, f64>,
        iteration: usize,
        rng: &mut StdRng,
    ) -> Vec<usize> {
        let all: Vec<usize> = (0..unlabeled.len()).collect();
        if unlabeled.is_empty() {
            return all;
        }

        let members = |cluster: usize| -> Vec<usize> {
            unlabeled
                .iter()
                .enumerate()
                .filter(|(_, &index)| self.assignments[index] == cluster)
                .map(|(position, _)| position)
                .collect()
        };

        let chosen = match strategy {
            ClusterStrategy::Dummy => return all,
            ClusterStrategy::Random => members(rng.random_range(0..self.k)),
            ClusterStrategy::RoundRobin => {
                let mut picked = Vec::new();
                for offset in 0..self.k {
                    picked = members((iteration + offset) % self.k);
                    if !picked.is_empty() {
                        break;
                    }
                }
                picked
            }
            ClusterStrategy::MostUncertainLc => members(self.most_uncertain(
                unlabeled,
                proba,
                least_confidence,
            )),
            ClusterStrategy::MostUncertainMaxMargin => members(self.most_uncertain(
                unlabeled,
                proba,
                margin_uncertainty,
            )),
            ClusterStrategy::MostUncertainEntropy => members(self.most_uncertain(
                unlabeled,
                proba,
                entropy_uncertainty,
            )),
        };

        if chosen.is_empty() {
            all
        } else {
            chosen
        }
    }

    fn most_uncertain(
        &self,
        unlabeled: &[usize],
        proba: ArrayView2<'_, f64>,
        measure: fn(&[f64]) -> f64,
    ) -> usize {
        let mut totals = vec![0.0; self.k];
        let mut counts = vec![0usize; self.k];
        for (position, &index) in unlabeled.iter().enumerate() {
            let row: Vec<f64> = proba.row(position).to_vec();
            let cluster = self.assignments[index];
            totals[cluster] += measure(&row);
            counts[cluster] += 1;
        }

        let mut best = 0;
        let mut best_mean = f64::NEG_INFINITY;
        for cluster in 0..self.k {
            if counts[cluster] == 0 {
                continue;
            }
            let mean = totals[cluster] / counts[cluster] as f64;
            if mean > best_mean {
                best = cluster;
                best_mean = mean;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn context() -> ClusterContext {
        // Two tight blobs -> two clusters
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.0],
            [10.0, 10.0],
            [10.1, 10.1],
            [10.2, 10.0],
        ];
        ClusterContext::build(x.view(), 2, 7).unwrap()
    }

    #[test]
    fn test_strategy_names_roundtrip() {
        for strategy in [
            ClusterStrategy::Dummy,
            ClusterStrategy::Random,
            ClusterStrategy::MostUncertainLc,
            ClusterStrategy::MostUncertainMaxMargin,
            ClusterStrategy::MostUncertainEntropy,
            ClusterStrategy::RoundRobin,
        ] {
            let parsed: ClusterStrategy = strategy.to_string().parse().unwrap();
            assert_eq!(parsed, strategy);
        }
        assert!("optics".parse::<ClusterStrategy>().is_err());
    }

    #[test]
    fn test_dummy_returns_everything() {
        let ctx = context();
        let unlabeled = vec![0, 1, 3, 4];
        let proba = array![[0.5, 0.5], [0.5, 0.5], [0.5, 0.5], [0.5, 0.5]];
        let mut rng = StdRng::seed_from_u64(0);
        let picked =
            ctx.candidates(ClusterStrategy::Dummy, &unlabeled, proba.view(), 0, &mut rng);
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_round_robin_cycles() {
        let ctx = context();
        let unlabeled = vec![0, 1, 2, 3, 4, 5];
        let proba = ndarray::Array2::from_elem((6, 2), 0.5);
        let mut rng = StdRng::seed_from_u64(0);

        let first =
            ctx.candidates(ClusterStrategy::RoundRobin, &unlabeled, proba.view(), 0, &mut rng);
        let second =
            ctx.candidates(ClusterStrategy::RoundRobin, &unlabeled, proba.view(), 1, &mut rng);
        assert_ne!(first, second);
        assert_eq!(first.len() + second.len(), 6);
    }

    #[test]
    fn test_most_uncertain_picks_fuzzy_cluster() {
        let ctx = context();
        // Pool: one point per blob; blob of point 5 is maximally uncertain
        let unlabeled = vec![0, 5];
        let proba = array![[0.95, 0.05], [0.5, 0.5]];
        let mut rng = StdRng::seed_from_u64(0);
        let picked = ctx.candidates(
            ClusterStrategy::MostUncertainEntropy,
            &unlabeled,
            proba.view(),
            0,
            &mut rng,
        );
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn test_empty_cluster_falls_back() {
        let ctx = context();
        // All pool members in one blob; random may pick the other
        let unlabeled = vec![0, 1, 2];
        let proba = ndarray::Array2::from_elem((3, 2), 0.5);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked =
                ctx.candidates(ClusterStrategy::Random, &unlabeled, proba.view(), 0, &mut rng);
            assert!(!picked.is_empty());
        }
    }
}
