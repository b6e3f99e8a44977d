//! Random hyperparameter search

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::cli::logging::{log, LogLevel};
use crate::config::ExperimentConfig;
use crate::store::{ExperimentResult, ResultStore};

use super::estimator::CycleEstimator;
use super::shim::with_placeholder;
use super::space::{SearchSpace, SpaceMode};
use super::trial::{SearchOutcome, Trial, TrialStatus};
use super::{pick_best, thread_pool, Result};

/// Independent uniform draws over the space, evaluated in parallel batches.
pub struct RandomSearch {
    space: SearchSpace,
    n_iter: usize,
    level: LogLevel,
}

impl RandomSearch {
    pub fn new(base: ExperimentConfig, n_iter: usize) -> Self {
        Self { space: SearchSpace::new(SpaceMode::Random, base), n_iter, level: LogLevel::Normal }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Evaluate `n_iter` draws over `dataset_names`. Result rows land in
    /// `store` between batches, always from the calling thread.
    ///
    /// Trial `i` draws its configuration from seed `random_seed + i`, so a
    /// rerun samples the same configurations regardless of worker count or
    /// scheduling.
    pub fn run(&self, dataset_names: &[String], store: &ResultStore) -> Result<SearchOutcome> {
        let names = with_placeholder(dataset_names);
        let master_seed = self.space.base().random_seed;
        let pool = thread_pool(self.space.base().cores)?;
        let batch = pool.current_num_threads().max(1) * 4;

        let mut trials = Vec::with_capacity(self.n_iter);
        let mut done = 0;
        while done < self.n_iter {
            let end = (done + batch).min(self.n_iter);
            let evaluated: Vec<(Trial, Vec<ExperimentResult>)> = pool.install(|| {
                (done..end)
                    .into_par_iter()
                    .map(|index| self.evaluate(index, &names, master_seed))
                    .collect()
            });
            for (trial, records) in evaluated {
                for record in &records {
                    store.insert(record)?;
                }
                if let TrialStatus::Failed(why) = &trial.status {
                    log(self.level, LogLevel::Normal, &format!("trial {} failed: {why}", trial.id));
                }
                trials.push(trial);
            }
            log(self.level, LogLevel::Verbose, &format!("{end}/{} trials done", self.n_iter));
            done = end;
        }

        let (best_config, best_score) = pick_best(&trials)?;
        Ok(SearchOutcome { best_config, best_score, trials })
    }

    fn evaluate(
        &self,
        index: usize,
        names: &[String],
        master_seed: u64,
    ) -> (Trial, Vec<ExperimentResult>) {
        let mut rng = StdRng::seed_from_u64(master_seed.wrapping_add(index as u64));
        let config = self.space.sample(&mut rng);
        let mut trial = Trial::new(index, config.clone());
        trial.status = TrialStatus::Running;

        let mut estimator = CycleEstimator::new(config).with_level(self.level);
        match estimator.fit(names).and_then(|()| estimator.score()) {
            Ok(score) => {
                trial.complete(score);
                (trial, estimator.into_records())
            }
            Err(err) => {
                trial.fail(err.to_string());
                (trial, Vec::new())
            }
        }
    }
}
