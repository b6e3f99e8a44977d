//! Hyperparameter domains shared by both search drivers
//!
//! The same fifteen dimensions back two samplers: the random driver draws
//! continuous values, the evolutionary driver works on index genomes over
//! finite grids and decodes them into configurations. Everything not listed
//! here (datasets path, classifier, seed, iteration budget, ...) passes
//! through from the base configuration unchanged.

use rand::rngs::StdRng;
use rand::Rng;

use crate::cluster::ClusterStrategy;
use crate::config::ExperimentConfig;
use crate::sampling::SamplerKind;

/// Which driver the space serves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpaceMode {
    /// Continuous draws, one independent sample per trial
    Random,
    /// Finite grids, so configurations stay representable as index genomes
    Evo,
}

const SAMPLING_CHOICES: [SamplerKind; 4] = [
    SamplerKind::Random,
    SamplerKind::UncertaintyLc,
    SamplerKind::UncertaintyMaxMargin,
    SamplerKind::UncertaintyEntropy,
];

const CLUSTER_CHOICES: [ClusterStrategy; 5] = [
    ClusterStrategy::Dummy,
    ClusterStrategy::Random,
    ClusterStrategy::MostUncertainLc,
    ClusterStrategy::MostUncertainMaxMargin,
    ClusterStrategy::MostUncertainEntropy,
];

const RATIO_CHOICES: [f64; 4] = [1.0 / 10.0, 1.0 / 100.0, 1.0 / 1000.0, 1.0 / 10000.0];

const ZERO_TO_ONE_POINTS: usize = 101;
const HALF_TO_ONE_POINTS: usize = 51;
const QUERY_POINTS: usize = 51;
const START_SET_POINTS: usize = 10;

const N_GENES: usize = 15;

/// Allele counts in genome order: sampling, cluster, queries per iteration,
/// start set size, the three stopping criteria, allow-after-stop, minimum
/// test accuracy, certainty threshold, certainty ratio, cluster unity size,
/// cluster labeled ratio, and the two recommendation switches.
const ALLELE_COUNTS: [usize; N_GENES] = [
    SAMPLING_CHOICES.len(),
    CLUSTER_CHOICES.len(),
    QUERY_POINTS,
    START_SET_POINTS,
    ZERO_TO_ONE_POINTS,
    ZERO_TO_ONE_POINTS,
    ZERO_TO_ONE_POINTS,
    2,
    HALF_TO_ONE_POINTS,
    HALF_TO_ONE_POINTS,
    RATIO_CHOICES.len(),
    HALF_TO_ONE_POINTS,
    HALF_TO_ONE_POINTS,
    2,
    2,
];

/// The searched hyperparameter space.
///
/// Snuba-lite stays disabled in every sampled configuration; its two fields
/// are pinned rather than searched.
#[derive(Clone, Debug)]
pub struct SearchSpace {
    mode: SpaceMode,
    base: ExperimentConfig,
    max_queries: usize,
}

impl SearchSpace {
    /// Build a space around the pass-through values of `base`. The sampled
    /// `nr_queries_per_iteration` ranges over `1..=base.nr_queries_per_iteration`.
    pub fn new(mode: SpaceMode, base: ExperimentConfig) -> Self {
        let max_queries = base.nr_queries_per_iteration.max(1);
        Self { mode, base, max_queries }
    }

    pub fn mode(&self) -> SpaceMode {
        self.mode
    }

    /// The configuration the sampled dimensions are layered over
    pub fn base(&self) -> &ExperimentConfig {
        &self.base
    }

    /// Draw one configuration
    pub fn sample(&self, rng: &mut StdRng) -> ExperimentConfig {
        match self.mode {
            SpaceMode::Random => self.sample_continuous(rng),
            SpaceMode::Evo => self.decode(&self.random_genome(rng)),
        }
    }

    fn sample_continuous(&self, rng: &mut StdRng) -> ExperimentConfig {
        let mut config = self.base.clone();
        config.sampling = SAMPLING_CHOICES[rng.random_range(0..SAMPLING_CHOICES.len())];
        config.cluster = CLUSTER_CHOICES[rng.random_range(0..CLUSTER_CHOICES.len())];
        config.nr_queries_per_iteration = rng.random_range(1..=self.max_queries);
        config.start_set_size = rng.random_range(0.001..0.101);
        config.stopping_criteria_uncertainty = rng.random::<f64>();
        config.stopping_criteria_acc = rng.random::<f64>();
        config.stopping_criteria_std = rng.random::<f64>();
        config.allow_recommendations_after_stop = rng.random::<bool>();
        config.minimum_test_accuracy_before_recommendations = rng.random_range(0.5..1.0);
        config.uncertainty_recommendation_certainty_threshold = rng.random_range(0.5..1.0);
        config.uncertainty_recommendation_ratio =
            RATIO_CHOICES[rng.random_range(0..RATIO_CHOICES.len())];
        config.cluster_recommendation_minimum_cluster_unity_size = rng.random_range(0.5..1.0);
        config.cluster_recommendation_ratio_labeled_unlabeled = rng.random_range(0.5..1.0);
        config.with_uncertainty_recommendation = rng.random::<bool>();
        config.with_cluster_recommendation = rng.random::<bool>();
        pin_singletons(&mut config);
        config
    }

    /// Number of genes in the evolutionary representation
    pub fn n_genes(&self) -> usize {
        N_GENES
    }

    /// Allele count per gene, in genome order
    pub fn allele_counts(&self) -> [usize; N_GENES] {
        ALLELE_COUNTS
    }

    /// Uniformly random genome
    pub fn random_genome(&self, rng: &mut StdRng) -> Vec<usize> {
        ALLELE_COUNTS.iter().map(|&count| rng.random_range(0..count)).collect()
    }

    /// Resample the allele at `gene_index` in place
    pub fn mutate_gene(&self, genome: &mut [usize], gene_index: usize, rng: &mut StdRng) {
        genome[gene_index] = rng.random_range(0..ALLELE_COUNTS[gene_index]);
    }

    /// Materialize a genome into a configuration. Genes follow the
    /// `ALLELE_COUNTS` order.
    pub fn decode(&self, genome: &[usize]) -> ExperimentConfig {
        let mut config = self.base.clone();
        config.sampling = SAMPLING_CHOICES[genome[0]];
        config.cluster = CLUSTER_CHOICES[genome[1]];
        config.nr_queries_per_iteration =
            int_grid_point(1, self.max_queries, QUERY_POINTS, genome[2]);
        config.start_set_size = grid_point(0.001, 0.1, START_SET_POINTS, genome[3]);
        config.stopping_criteria_uncertainty = grid_point(0.0, 1.0, ZERO_TO_ONE_POINTS, genome[4]);
        config.stopping_criteria_acc = grid_point(0.0, 1.0, ZERO_TO_ONE_POINTS, genome[5]);
        config.stopping_criteria_std = grid_point(0.0, 1.0, ZERO_TO_ONE_POINTS, genome[6]);
        config.allow_recommendations_after_stop = genome[7] == 1;
        config.minimum_test_accuracy_before_recommendations =
            grid_point(0.5, 1.0, HALF_TO_ONE_POINTS, genome[8]);
        config.uncertainty_recommendation_certainty_threshold =
            grid_point(0.5, 1.0, HALF_TO_ONE_POINTS, genome[9]);
        config.uncertainty_recommendation_ratio = RATIO_CHOICES[genome[10]];
        config.cluster_recommendation_minimum_cluster_unity_size =
            grid_point(0.5, 1.0, HALF_TO_ONE_POINTS, genome[11]);
        config.cluster_recommendation_ratio_labeled_unlabeled =
            grid_point(0.5, 1.0, HALF_TO_ONE_POINTS, genome[12]);
        config.with_uncertainty_recommendation = genome[13] == 1;
        config.with_cluster_recommendation = genome[14] == 1;
        pin_singletons(&mut config);
        config
    }
}

fn pin_singletons(config: &mut ExperimentConfig) {
    config.with_snuba_lite = false;
    config.snuba_lite_minimum_heuristic_accuracy = 0.0;
}

/// The `index`-th of `n` evenly spaced points over `[start, end]`
fn grid_point(start: f64, end: f64, n: usize, index: usize) -> f64 {
    start + (end - start) * index as f64 / (n - 1) as f64
}

/// The `index`-th of `n` evenly spaced integers over `[min, max]`. When the
/// range holds fewer than `n` integers, neighboring points collide; that is
/// harmless, the grid just repeats values.
fn int_grid_point(min: usize, max: usize, n: usize, index: usize) -> usize {
    if max <= min {
        return min;
    }
    min + ((max - min) as f64 * index as f64 / (n - 1) as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn base() -> ExperimentConfig {
        ExperimentConfig::default().with_nr_queries_per_iteration(150)
    }

    #[test]
    fn test_allele_counts() {
        let space = SearchSpace::new(SpaceMode::Evo, base());
        assert_eq!(space.n_genes(), 15);
        assert_eq!(
            space.allele_counts(),
            [4, 5, 51, 10, 101, 101, 101, 2, 51, 51, 4, 51, 51, 2, 2]
        );
    }

    #[test]
    fn test_random_samples_stay_in_domain() {
        let space = SearchSpace::new(SpaceMode::Random, base());
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let config = space.sample(&mut rng);
            assert!(config.validate().is_ok());
            assert!((1..=150).contains(&config.nr_queries_per_iteration));
            assert!(config.start_set_size >= 0.001 && config.start_set_size < 0.101);
            assert!(config.stopping_criteria_uncertainty < 1.0);
            assert!(config.minimum_test_accuracy_before_recommendations >= 0.5);
            assert!(config.cluster_recommendation_minimum_cluster_unity_size < 1.0);
            assert!(RATIO_CHOICES.contains(&config.uncertainty_recommendation_ratio));
            assert!(SAMPLING_CHOICES.contains(&config.sampling));
            assert!(CLUSTER_CHOICES.contains(&config.cluster));
        }
    }

    #[test]
    fn test_evo_samples_land_on_grids() {
        let space = SearchSpace::new(SpaceMode::Evo, base());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let config = space.sample(&mut rng);
            assert!(config.validate().is_ok());
            let start_grid: Vec<f64> =
                (0..START_SET_POINTS).map(|i| grid_point(0.001, 0.1, START_SET_POINTS, i)).collect();
            assert!(start_grid.iter().any(|g| (g - config.start_set_size).abs() < 1e-12));
            let stop_scaled = config.stopping_criteria_acc * 100.0;
            assert!((stop_scaled - stop_scaled.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_decode_zero_genome_hits_lower_bounds() {
        let space = SearchSpace::new(SpaceMode::Evo, base());
        let config = space.decode(&[0; 15]);
        assert_eq!(config.sampling, SamplerKind::Random);
        assert_eq!(config.cluster, ClusterStrategy::Dummy);
        assert_eq!(config.nr_queries_per_iteration, 1);
        assert!((config.start_set_size - 0.001).abs() < 1e-12);
        assert_eq!(config.stopping_criteria_uncertainty, 0.0);
        assert!((config.minimum_test_accuracy_before_recommendations - 0.5).abs() < 1e-12);
        assert!((config.uncertainty_recommendation_ratio - 0.1).abs() < 1e-12);
        assert!(!config.allow_recommendations_after_stop);
        assert!(!config.with_uncertainty_recommendation);
        assert!(!config.with_cluster_recommendation);
    }

    #[test]
    fn test_decode_max_genome_hits_upper_bounds() {
        let space = SearchSpace::new(SpaceMode::Evo, base());
        let genome: Vec<usize> = space.allele_counts().iter().map(|&c| c - 1).collect();
        let config = space.decode(&genome);
        assert_eq!(config.sampling, SamplerKind::UncertaintyEntropy);
        assert_eq!(config.cluster, ClusterStrategy::MostUncertainEntropy);
        assert_eq!(config.nr_queries_per_iteration, 150);
        assert!((config.start_set_size - 0.1).abs() < 1e-12);
        assert_eq!(config.stopping_criteria_std, 1.0);
        assert!((config.minimum_test_accuracy_before_recommendations - 1.0).abs() < 1e-12);
        assert!((config.uncertainty_recommendation_ratio - 0.0001).abs() < 1e-12);
        assert!(config.allow_recommendations_after_stop);
        assert!(config.with_uncertainty_recommendation);
        assert!(config.with_cluster_recommendation);
    }

    #[test]
    fn test_snuba_stays_pinned() {
        let mut pinned = base();
        pinned.with_snuba_lite = true;
        pinned.snuba_lite_minimum_heuristic_accuracy = 0.9;
        let mut rng = StdRng::seed_from_u64(3);
        for mode in [SpaceMode::Random, SpaceMode::Evo] {
            let config = SearchSpace::new(mode, pinned.clone()).sample(&mut rng);
            assert!(!config.with_snuba_lite);
            assert_eq!(config.snuba_lite_minimum_heuristic_accuracy, 0.0);
        }
    }

    #[test]
    fn test_queries_respect_base_cap() {
        let small = ExperimentConfig::default().with_nr_queries_per_iteration(10);
        let space = SearchSpace::new(SpaceMode::Random, small.clone());
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..30 {
            assert!(space.sample(&mut rng).nr_queries_per_iteration <= 10);
        }
        let evo = SearchSpace::new(SpaceMode::Evo, small);
        let genome: Vec<usize> = evo.allele_counts().iter().map(|&c| c - 1).collect();
        assert_eq!(evo.decode(&genome).nr_queries_per_iteration, 10);
    }

    #[test]
    fn test_same_seed_same_sample() {
        let space = SearchSpace::new(SpaceMode::Random, base());
        let a = space.sample(&mut StdRng::seed_from_u64(11));
        let b = space.sample(&mut StdRng::seed_from_u64(11));
        assert_eq!(a.param_list_id(), b.param_list_id());
    }

    #[test]
    fn test_mutate_gene_stays_in_range() {
        let space = SearchSpace::new(SpaceMode::Evo, base());
        let mut rng = StdRng::seed_from_u64(5);
        let mut genome = space.random_genome(&mut rng);
        for index in 0..space.n_genes() {
            space.mutate_gene(&mut genome, index, &mut rng);
            assert!(genome[index] < space.allele_counts()[index]);
        }
    }
}
