//! Oracle query samplers
//!
//! Ranks unlabeled candidates most-informative first. Uncertainty measures
//! read the class probabilities of the current model; committee sampling
//! reads member votes; boundary sampling reads the feature geometry.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::argmax;

/// Sampling errors
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Cannot rank an empty candidate set")]
    EmptyCandidates,

    #[error("Committee sampling requires member votes")]
    MissingVotes,

    #[error("Unknown sampling strategy: {0}")]
    UnknownStrategy(String),
}

/// Result type for sampling operations
pub type Result<T> = std::result::Result<T, SamplingError>;

/// 1 minus the top class probability
pub fn least_confidence(proba: &[f64]) -> f64 {
    let top = proba.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    1.0 - top
}

/// 1 minus the gap between the two top class probabilities
pub fn margin_uncertainty(proba: &[f64]) -> f64 {
    if proba.len() < 2 {
        return 0.0;
    }
    let mut first = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;
    for &p in proba {
        if p > first {
            second = first;
            first = p;
        } else if p > second {
            second = p;
        }
    }
    1.0 - (first - second)
}

/// Shannon entropy of the class distribution, in nats
pub fn entropy_uncertainty(proba: &[f64]) -> f64 {
    -proba
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

/// Entropy of the vote distribution across committee members
pub fn vote_entropy(votes: &[usize], n_classes: usize) -> f64 {
    if votes.is_empty() {
        return 0.0;
    }
    let mut counts = vec![0usize; n_classes];
    for &vote in votes {
        if vote < n_classes {
            counts[vote] += 1;
        }
    }
    let total = votes.len() as f64;
    -counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let share = count as f64 / total;
            share * share.ln()
        })
        .sum::<f64>()
}

/// Candidate inputs for one oracle query.
///
/// Rows of `proba` and `features` follow candidate order. `committee_votes`
/// holds one prediction per member for each candidate when a committee was
/// trained alongside the main model.
pub struct QueryContext<'a> {
    pub proba: ArrayView2<'a, f64>,
    pub features: ArrayView2<'a, f64>,
    pub committee_votes: Option<&'a [Vec<usize>]>,
}

/// Selectable query sampler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    /// Uniform shuffle of the candidates
    Random,
    /// Least confidence, descending
    UncertaintyLc,
    /// Margin between the two top classes, descending uncertainty
    UncertaintyMaxMargin,
    /// Class distribution entropy, descending
    UncertaintyEntropy,
    /// Vote entropy across committee members, descending
    Committee,
    /// Distance to the nearest differently-predicted candidate, ascending
    BoundaryPair,
}

impl fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SamplerKind::Random => "random",
            SamplerKind::UncertaintyLc => "uncertainty_lc",
            SamplerKind::UncertaintyMaxMargin => "uncertainty_max_margin",
            SamplerKind::UncertaintyEntropy => "uncertainty_entropy",
            SamplerKind::Committee => "committee",
            SamplerKind::BoundaryPair => "boundary_pair",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SamplerKind {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(SamplerKind::Random),
            "uncertainty_lc" => Ok(SamplerKind::UncertaintyLc),
            "uncertainty_max_margin" => Ok(SamplerKind::UncertaintyMaxMargin),
            "uncertainty_entropy" => Ok(SamplerKind::UncertaintyEntropy),
            "committee" => Ok(SamplerKind::Committee),
            "boundary_pair" => Ok(SamplerKind::BoundaryPair),
            other => Err(SamplingError::UnknownStrategy(other.to_string())),
        }
    }
}

impl SamplerKind {
    /// Whether ranking needs committee member votes
    pub fn needs_committee(&self) -> bool {
        matches!(self, SamplerKind::Committee)
    }

    /// Rank candidates most-informative first.
    ///
    /// Returns positions into the candidate set.
    pub fn rank(&self, context: &QueryContext<'_>, rng: &mut StdRng) -> Result<Vec<usize>> {
        let n = context.proba.nrows();
        if n == 0 {
            return Err(SamplingError::EmptyCandidates);
        }

        match self {
            SamplerKind::Random => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(rng);
                Ok(order)
            }
            SamplerKind::UncertaintyLc => Ok(rank_descending(context.proba, least_confidence)),
            SamplerKind::UncertaintyMaxMargin => {
                Ok(rank_descending(context.proba, margin_uncertainty))
            }
            SamplerKind::UncertaintyEntropy => {
                Ok(rank_descending(context.proba, entropy_uncertainty))
            }
            SamplerKind::Committee => {
                let votes = context.committee_votes.ok_or(SamplingError::MissingVotes)?;
                let n_classes = context.proba.ncols();
                let mut scored: Vec<(usize, f64)> = votes
                    .iter()
                    .take(n)
                    .enumerate()
                    .map(|(position, member_votes)| {
                        (position, vote_entropy(member_votes, n_classes))
                    })
                    .collect();
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                Ok(scored.into_iter().map(|(position, _)| position).collect())
            }
            SamplerKind::BoundaryPair => Ok(rank_by_boundary(context)),
        }
    }
}

fn rank_descending(proba: ArrayView2<'_, f64>, measure: fn(&[f64]) -> f64) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = proba
        .rows()
        .into_iter()
        .enumerate()
        .map(|(position, row)| (position, measure(&row.to_vec())))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(position, _)| position).collect()
}

/// Ascending distance to the nearest candidate the model labels differently.
/// Candidates without such a neighbor sort last.
fn rank_by_boundary(context: &QueryContext<'_>) -> Vec<usize> {
    let n = context.proba.nrows();
    let labels: Vec<usize> = context
        .proba
        .rows()
        .into_iter()
        .map(|row| argmax(row.iter().copied()))
        .collect();

    let mut scored: Vec<(usize, f64)> = (0..n)
        .map(|i| {
            let mut nearest = f64::INFINITY;
            for j in 0..n {
                if labels[j] == labels[i] {
                    continue;
                }
                let distance: f64 = context
                    .features
                    .row(i)
                    .iter()
                    .zip(context.features.row(j).iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                if distance < nearest {
                    nearest = distance;
                }
            }
            (i, nearest)
        })
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(position, _)| position).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_least_confidence() {
        assert!((least_confidence(&[0.9, 0.1]) - 0.1).abs() < 1e-12);
        assert!((least_confidence(&[0.5, 0.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_margin_uncertainty() {
        assert!((margin_uncertainty(&[0.6, 0.3, 0.1]) - 0.7).abs() < 1e-12);
        assert!((margin_uncertainty(&[1.0, 0.0]) - 0.0).abs() < 1e-12);
        assert_eq!(margin_uncertainty(&[1.0]), 0.0);
    }

    #[test]
    fn test_entropy_uncertainty() {
        assert!((entropy_uncertainty(&[0.5, 0.5]) - std::f64::consts::LN_2).abs() < 1e-12);
        assert_eq!(entropy_uncertainty(&[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_vote_entropy() {
        assert_eq!(vote_entropy(&[1, 1, 1], 3), 0.0);
        let split = vote_entropy(&[0, 1], 2);
        assert!((split - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_sampler_names_roundtrip() {
        for sampler in [
            SamplerKind::Random,
            SamplerKind::UncertaintyLc,
            SamplerKind::UncertaintyMaxMargin,
            SamplerKind::UncertaintyEntropy,
            SamplerKind::Committee,
            SamplerKind::BoundaryPair,
        ] {
            let parsed: SamplerKind = sampler.to_string().parse().unwrap();
            assert_eq!(parsed, sampler);
        }
        assert!("expected_error_reduction".parse::<SamplerKind>().is_err());
    }

    #[test]
    fn test_uncertainty_rank_puts_fuzzy_first() {
        let proba = array![[0.95, 0.05], [0.55, 0.45], [0.80, 0.20]];
        let features = array![[0.0], [1.0], [2.0]];
        let context = QueryContext {
            proba: proba.view(),
            features: features.view(),
            committee_votes: None,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let order = SamplerKind::UncertaintyLc.rank(&context, &mut rng).unwrap();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_random_rank_is_permutation() {
        let proba = ndarray::Array2::from_elem((5, 2), 0.5);
        let features = ndarray::Array2::zeros((5, 1));
        let context = QueryContext {
            proba: proba.view(),
            features: features.view(),
            committee_votes: None,
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut order = SamplerKind::Random.rank(&context, &mut rng).unwrap();
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_committee_requires_votes() {
        let proba = array![[0.5, 0.5]];
        let features = array![[0.0]];
        let context = QueryContext {
            proba: proba.view(),
            features: features.view(),
            committee_votes: None,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let result = SamplerKind::Committee.rank(&context, &mut rng);
        assert!(matches!(result, Err(SamplingError::MissingVotes)));
    }

    #[test]
    fn test_committee_ranks_split_votes_first() {
        let proba = array![[0.5, 0.5], [0.5, 0.5]];
        let features = array![[0.0], [1.0]];
        let votes = vec![vec![0, 0], vec![0, 1]];
        let context = QueryContext {
            proba: proba.view(),
            features: features.view(),
            committee_votes: Some(&votes),
        };
        let mut rng = StdRng::seed_from_u64(0);
        let order = SamplerKind::Committee.rank(&context, &mut rng).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_boundary_rank_prefers_close_opposed_pair() {
        // Candidates 0/1 sit on opposite sides of a tight boundary,
        // candidate 2 is far from any opposing point
        let proba = array![[0.9, 0.1], [0.1, 0.9], [0.9, 0.1]];
        let features = array![[0.0, 0.0], [0.1, 0.0], [9.0, 9.0]];
        let context = QueryContext {
            proba: proba.view(),
            features: features.view(),
            committee_votes: None,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let order = SamplerKind::BoundaryPair.rank(&context, &mut rng).unwrap();
        assert_eq!(order[2], 2);
    }

    #[test]
    fn test_empty_candidates_error() {
        let proba = ndarray::Array2::<f64>::zeros((0, 2));
        let features = ndarray::Array2::<f64>::zeros((0, 1));
        let context = QueryContext {
            proba: proba.view(),
            features: features.view(),
            committee_votes: None,
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            SamplerKind::Random.rank(&context, &mut rng),
            Err(SamplingError::EmptyCandidates)
        ));
    }
}
