//! Weak-label recommenders
//!
//! Both recommenders propose labels without consulting the oracle. Cluster
//! recommendation trusts a k-means cluster once enough of it is labeled and
//! its labeled members agree; certainty recommendation trusts the model's
//! own most confident predictions.

use std::cmp::Ordering;

use ndarray::ArrayView2;

use crate::cluster::ClusterContext;
use crate::config::ExperimentConfig;
use crate::data::{LabelSource, PoolSet};
use crate::model::argmax;

/// A batch of proposed weak labels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recommendation {
    pub source: LabelSource,
    /// (training index, assigned label) pairs
    pub assignments: Vec<(usize, usize)>,
}

/// Label every unlabeled member of the first qualifying cluster with that
/// cluster's majority label.
///
/// A cluster qualifies when its labeled:unlabeled ratio reaches
/// `cluster_recommendation_ratio_labeled_unlabeled` and the majority label's
/// share among its labeled members reaches
/// `cluster_recommendation_minimum_cluster_unity_size`.
pub fn cluster_recommendation(
    pools: &PoolSet,
    clusters: &ClusterContext,
    n_classes: usize,
    config: &ExperimentConfig,
) -> Option<Recommendation> {
    for cluster in 0..clusters.k() {
        let mut label_counts = vec![0usize; n_classes];
        let mut n_labeled = 0usize;
        for point in pools.labeled() {
            if clusters.cluster_of(point.index) == cluster {
                label_counts[point.label] += 1;
                n_labeled += 1;
            }
        }
        if n_labeled == 0 {
            continue;
        }

        let members: Vec<usize> = pools
            .unlabeled()
            .iter()
            .copied()
            .filter(|&index| clusters.cluster_of(index) == cluster)
            .collect();
        if members.is_empty() {
            continue;
        }

        let ratio = n_labeled as f64 / members.len() as f64;
        if ratio < config.cluster_recommendation_ratio_labeled_unlabeled {
            continue;
        }

        let majority = argmax(label_counts.iter().map(|&count| count as f64));
        let unity = label_counts[majority] as f64 / n_labeled as f64;
        if unity < config.cluster_recommendation_minimum_cluster_unity_size {
            continue;
        }

        let assignments = members.into_iter().map(|index| (index, majority)).collect();
        return Some(Recommendation {
            source: LabelSource::WeakCluster,
            assignments,
        });
    }
    None
}

/// Label the most certain unlabeled points with the model's own prediction.
///
/// Only points whose top class probability reaches
/// `uncertainty_recommendation_certainty_threshold` qualify; the batch is
/// capped at `ceil(ratio * n_unlabeled)`, most certain first.
pub fn certainty_recommendation(
    unlabeled: &[usize],
    proba: ArrayView2<'_, f64>,
    config: &ExperimentConfig,
) -> Option<Recommendation> {
    if unlabeled.is_empty() {
        return None;
    }

    let mut certain: Vec<(usize, usize, f64)> = Vec::new();
    for (position, &index) in unlabeled.iter().enumerate() {
        let row = proba.row(position);
        let certainty = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if certainty >= config.uncertainty_recommendation_certainty_threshold {
            certain.push((index, argmax(row.iter().copied()), certainty));
        }
    }
    if certain.is_empty() {
        return None;
    }

    certain.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    let cap = (config.uncertainty_recommendation_ratio * unlabeled.len() as f64).ceil() as usize;
    certain.truncate(cap.max(1));

    let assignments = certain
        .into_iter()
        .map(|(index, label, _)| (index, label))
        .collect();
    Some(Recommendation {
        source: LabelSource::WeakCertainty,
        assignments,
    })
}
