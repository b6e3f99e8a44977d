//! Evolutionary hyperparameter search
//!
//! Generational GA over index genomes: tournament selection, uniform
//! crossover, per-gene resampling mutation, elitism of one. Fitness is the
//! mean fit score over the dataset list; a failed evaluation sinks to
//! negative infinity so selection never favors it.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::cli::logging::{log, LogLevel};
use crate::config::ExperimentConfig;
use crate::store::{ExperimentResult, ResultStore};

use super::estimator::CycleEstimator;
use super::shim::with_placeholder;
use super::space::{SearchSpace, SpaceMode};
use super::trial::{SearchOutcome, Trial, TrialStatus};
use super::{pick_best, thread_pool, Result};

pub struct EvolutionarySearch {
    space: SearchSpace,
    population_size: usize,
    generations: usize,
    tournament_size: usize,
    gene_mutation_prob: f64,
    level: LogLevel,
}

impl EvolutionarySearch {
    pub fn new(base: ExperimentConfig, population_size: usize, generations: usize) -> Self {
        Self {
            space: SearchSpace::new(SpaceMode::Evo, base),
            population_size: population_size.max(2),
            generations: generations.max(1),
            tournament_size: 3,
            gene_mutation_prob: 0.3,
            level: LogLevel::Normal,
        }
    }

    pub fn with_tournament_size(mut self, tournament_size: usize) -> Self {
        self.tournament_size = tournament_size.max(1);
        self
    }

    pub fn with_gene_mutation_prob(mut self, prob: f64) -> Self {
        self.gene_mutation_prob = prob.clamp(0.0, 1.0);
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Evolve the population over `dataset_names`, persisting every finished
    /// row into `store` between generations from the calling thread. Every
    /// genome of every generation becomes one trial in the outcome.
    pub fn run(&self, dataset_names: &[String], store: &ResultStore) -> Result<SearchOutcome> {
        let names = with_placeholder(dataset_names);
        let pool = thread_pool(self.space.base().cores)?;
        let mut rng = StdRng::seed_from_u64(self.space.base().random_seed);

        let mut population: Vec<Vec<usize>> =
            (0..self.population_size).map(|_| self.space.random_genome(&mut rng)).collect();

        let mut trials = Vec::with_capacity(self.population_size * self.generations);
        let mut next_id = 0;

        for generation in 0..self.generations {
            let evaluated: Vec<(Trial, Vec<ExperimentResult>, f64)> = pool.install(|| {
                population
                    .par_iter()
                    .enumerate()
                    .map(|(slot, genome)| self.evaluate(next_id + slot, genome, &names))
                    .collect()
            });

            let mut fitness = Vec::with_capacity(self.population_size);
            for (trial, records, fit) in evaluated {
                for record in &records {
                    store.insert(record)?;
                }
                if let TrialStatus::Failed(why) = &trial.status {
                    log(self.level, LogLevel::Normal, &format!("trial {} failed: {why}", trial.id));
                }
                fitness.push(fit);
                trials.push(trial);
            }
            next_id += self.population_size;

            let generation_best = fitness.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            log(
                self.level,
                LogLevel::Normal,
                &format!("generation {generation}: best {generation_best:.4}"),
            );

            if generation + 1 == self.generations {
                break;
            }
            population = self.next_generation(&population, &fitness, &mut rng);
        }

        let (best_config, best_score) = pick_best(&trials)?;
        Ok(SearchOutcome { best_config, best_score, trials })
    }

    fn evaluate(
        &self,
        id: usize,
        genome: &[usize],
        names: &[String],
    ) -> (Trial, Vec<ExperimentResult>, f64) {
        let config = self.space.decode(genome);
        let mut trial = Trial::new(id, config.clone());
        trial.status = TrialStatus::Running;

        let mut estimator = CycleEstimator::new(config).with_level(self.level);
        match estimator.fit(names).and_then(|()| estimator.score()) {
            Ok(score) => {
                trial.complete(score);
                (trial, estimator.into_records(), score)
            }
            Err(err) => {
                trial.fail(err.to_string());
                (trial, Vec::new(), f64::NEG_INFINITY)
            }
        }
    }

    /// Full generational replacement, except the fittest genome survives
    /// verbatim.
    fn next_generation(
        &self,
        population: &[Vec<usize>],
        fitness: &[f64],
        rng: &mut StdRng,
    ) -> Vec<Vec<usize>> {
        let mut next = Vec::with_capacity(self.population_size);

        let elite = (0..population.len())
            .max_by(|&a, &b| fitness[a].partial_cmp(&fitness[b]).unwrap_or(Ordering::Equal))
            .unwrap_or(0);
        next.push(population[elite].clone());

        while next.len() < self.population_size {
            let parent_a = self.tournament_select(population, fitness, rng);
            let parent_b = self.tournament_select(population, fitness, rng);
            let (mut child_a, mut child_b) = uniform_crossover(parent_a, parent_b, rng);
            self.mutate(&mut child_a, rng);
            self.mutate(&mut child_b, rng);
            next.push(child_a);
            if next.len() < self.population_size {
                next.push(child_b);
            }
        }
        next
    }

    fn tournament_select<'a>(
        &self,
        population: &'a [Vec<usize>],
        fitness: &[f64],
        rng: &mut StdRng,
    ) -> &'a [usize] {
        let mut best = rng.random_range(0..population.len());
        for _ in 1..self.tournament_size {
            let challenger = rng.random_range(0..population.len());
            if fitness[challenger] > fitness[best] {
                best = challenger;
            }
        }
        &population[best]
    }

    fn mutate(&self, genome: &mut [usize], rng: &mut StdRng) {
        for index in 0..genome.len() {
            if rng.random::<f64>() < self.gene_mutation_prob {
                self.space.mutate_gene(genome, index, rng);
            }
        }
    }
}

/// Per-gene coin flip; each position of the two children comes from one
/// parent each.
fn uniform_crossover(a: &[usize], b: &[usize], rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut child_a = Vec::with_capacity(a.len());
    let mut child_b = Vec::with_capacity(b.len());
    for i in 0..a.len() {
        if rng.random::<bool>() {
            child_a.push(a[i]);
            child_b.push(b[i]);
        } else {
            child_a.push(b[i]);
            child_b.push(a[i]);
        }
    }
    (child_a, child_b)
}
