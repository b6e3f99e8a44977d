//! Seeded k-means

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ClusterError, Result};

/// Lloyd's k-means with k-means++ initialization
///
/// Fully deterministic for a fixed seed. Used once per cycle to partition the
/// training features; the cluster strategies then work off the assignments.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
    centroids: Option<Array2<f64>>,
}

impl KMeans {
    /// Create an unfitted model with `k` clusters
    pub fn new(k: usize) -> Self {
        Self { k, max_iter: 100, tol: 1e-6, seed: 42, centroids: None }
    }

    /// Override the iteration cap
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Override the initialization seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit centroids and return the per-row cluster assignment
    pub fn fit_predict(&mut self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let n = x.nrows();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if self.k == 0 || self.k > n {
            return Err(ClusterError::InvalidK { k: self.k, n_samples: n });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.init_plus_plus(x, &mut rng);
        let mut assignments = vec![0; n];

        for _ in 0..self.max_iter {
            for (row, assignment) in assignments.iter_mut().enumerate() {
                *assignment = nearest_centroid(x.row(row), centroids.view());
            }

            let mut next = Array2::zeros((self.k, x.ncols()));
            let mut counts = vec![0usize; self.k];
            for (row, &assignment) in assignments.iter().enumerate() {
                let mut target = next.row_mut(assignment);
                target += &x.row(row);
                counts[assignment] += 1;
            }
            for cluster in 0..self.k {
                if counts[cluster] == 0 {
                    // Re-seed an empty cluster from a random row
                    let row = rng.random_range(0..n);
                    next.row_mut(cluster).assign(&x.row(row));
                } else {
                    let mut target = next.row_mut(cluster);
                    target /= counts[cluster] as f64;
                }
            }

            let shift: f64 = centroids
                .rows()
                .into_iter()
                .zip(next.rows())
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = next;
            if shift < self.tol {
                break;
            }
        }

        for (row, assignment) in assignments.iter_mut().enumerate() {
            *assignment = nearest_centroid(x.row(row), centroids.view());
        }
        self.centroids = Some(centroids);
        Ok(assignments)
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.k
    }

    fn init_plus_plus(&self, x: ArrayView2<'_, f64>, rng: &mut StdRng) -> Array2<f64> {
        let n = x.nrows();
        let mut centroids = Array2::zeros((self.k, x.ncols()));

        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&x.row(first));

        let mut min_dist: Vec<f64> =
            (0..n).map(|row| squared_distance(x.row(row), centroids.row(0))).collect();

        for cluster in 1..self.k {
            let total: f64 = min_dist.iter().sum();
            let chosen = if total > 0.0 {
                let mut target = rng.random::<f64>() * total;
                let mut pick = n - 1;
                for (row, &d) in min_dist.iter().enumerate() {
                    if target <= d {
                        pick = row;
                        break;
                    }
                    target -= d;
                }
                pick
            } else {
                rng.random_range(0..n)
            };

            centroids.row_mut(cluster).assign(&x.row(chosen));
            for (row, dist) in min_dist.iter_mut().enumerate() {
                let d = squared_distance(x.row(row), centroids.row(cluster));
                if d < *dist {
                    *dist = d;
                }
            }
        }

        centroids
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest_centroid(row: ArrayView1<'_, f64>, centroids: ArrayView2<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (cluster, centroid) in centroids.rows().into_iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best_dist {
            best = cluster;
            best_dist = d;
        }
    }
    best
}
