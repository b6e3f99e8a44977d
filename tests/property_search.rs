//! Property tests for the search space and the score rescaling
//!
//! The searched domains and the chance-rescaled scores must hold up under
//! arbitrary inputs:
//! - every sampled or decoded configuration passes validation
//! - genomes stay within their allele counts
//! - the one-fold splitter never drops a position
//! - global scores stay finite and inside their algebraic bounds

use indagar::config::ExperimentConfig;
use indagar::cycle::global_score;
use indagar::search::{SearchSpace, SingleFoldSplit, SpaceMode};
use proptest::collection::vec;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Paired value/weight series of one length
fn weighted_series(
    len: std::ops::Range<usize>,
) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    len.prop_flat_map(|l| (vec(0.0f64..=1.0, l), vec(0.01f64..10.0, l)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // -------------------------------------------------------------------------
    // One-fold splitter
    // -------------------------------------------------------------------------

    #[test]
    fn prop_single_fold_split_covers_everything(n in 1usize..300) {
        let splits = SingleFoldSplit::default().split(n);
        prop_assert_eq!(splits.len(), 1);

        let (train, test) = &splits[0];
        prop_assert_eq!(train.len() + test.len(), n);
        prop_assert_eq!(test, &vec![n - 1]);
        for (position, &index) in train.iter().enumerate() {
            prop_assert_eq!(index, position);
        }
    }

    // -------------------------------------------------------------------------
    // Sampled configurations
    // -------------------------------------------------------------------------

    #[test]
    fn prop_random_samples_always_valid(seed in any::<u64>()) {
        let space = SearchSpace::new(SpaceMode::Random, ExperimentConfig::default());
        let config = space.sample(&mut StdRng::seed_from_u64(seed));

        prop_assert!(config.validate().is_ok());
        prop_assert!((1..=150).contains(&config.nr_queries_per_iteration));
        prop_assert!(!config.with_snuba_lite);
        prop_assert_eq!(config.snuba_lite_minimum_heuristic_accuracy, 0.0);
    }

    #[test]
    fn prop_genomes_decode_to_valid_configs(seed in any::<u64>()) {
        let space = SearchSpace::new(SpaceMode::Evo, ExperimentConfig::default());
        let genome = space.random_genome(&mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(genome.len(), space.n_genes());
        for (index, &allele) in genome.iter().enumerate() {
            prop_assert!(allele < space.allele_counts()[index]);
        }

        let config = space.decode(&genome);
        prop_assert!(config.validate().is_ok());
        prop_assert!((1..=150).contains(&config.nr_queries_per_iteration));
        prop_assert!(!config.with_snuba_lite);
    }

    #[test]
    fn prop_grouping_id_ignores_bookkeeping(seed in any::<u64>(), other_seed in any::<u64>()) {
        let space = SearchSpace::new(SpaceMode::Random, ExperimentConfig::default());
        let config = space.sample(&mut StdRng::seed_from_u64(seed));

        let reseeded = config
            .clone()
            .with_random_seed(other_seed)
            .with_datasets_path("/elsewhere")
            .with_db("other.db");
        prop_assert_eq!(config.param_list_id(), reseeded.param_list_id());
    }

    // -------------------------------------------------------------------------
    // Chance-rescaled scores
    // -------------------------------------------------------------------------

    #[test]
    fn prop_global_score_stays_in_algebraic_bounds(
        (values, weights) in weighted_series(1..20),
        n_classes in 2usize..6,
    ) {
        let score = global_score(&values, &weights, n_classes).expect("score");
        let lower = -1.0 / (n_classes as f64 - 1.0);

        prop_assert!(score.is_finite());
        prop_assert!(
            score <= 1.0 + 1e-9,
            "score {} above the perfect-classifier bound",
            score
        );
        prop_assert!(
            score >= lower - 1e-9,
            "score {} below the all-wrong bound {}",
            score, lower
        );
    }

    #[test]
    fn prop_global_score_chance_is_zero(
        n_classes in 2usize..6,
        weights in vec(0.01f64..10.0, 1..20),
    ) {
        let chance = 1.0 / n_classes as f64;
        let values = vec![chance; weights.len()];
        let score = global_score(&values, &weights, n_classes).expect("score");
        prop_assert!(score.abs() < 1e-9);
    }

    #[test]
    fn prop_global_score_perfect_is_one(
        weights in vec(0.01f64..10.0, 1..20),
        n_classes in 2usize..6,
    ) {
        let values = vec![1.0; weights.len()];
        let score = global_score(&values, &weights, n_classes).expect("score");
        prop_assert!((score - 1.0).abs() < 1e-9);
    }
}
