//! Per-trial estimator
//!
//! Fits one configuration across a list of dataset names, one full cycle per
//! name, and keeps both the fitness scores and the result rows to persist.
//! The rows stay in memory until the driver collects them; connections never
//! cross worker threads.

use crate::cli::logging::{log, LogLevel};
use crate::config::ExperimentConfig;
use crate::cycle::run_cycle;
use crate::data::load_dataset;
use crate::store::ExperimentResult;

use super::shim::DATASET_PLACEHOLDER;
use super::{Result, SearchError};

pub struct CycleEstimator {
    config: ExperimentConfig,
    level: LogLevel,
    scores: Vec<f64>,
    records: Vec<ExperimentResult>,
}

impl CycleEstimator {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config, level: LogLevel::Normal, scores: Vec::new(), records: Vec::new() }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Run one cycle per named dataset. A trailing placeholder entry is
    /// skipped; it exists only to satisfy the splitter shape.
    pub fn fit(&mut self, dataset_names: &[String]) -> Result<()> {
        let names = dataset_names
            .split_last()
            .filter(|(last, _)| last.as_str() == DATASET_PLACEHOLDER)
            .map(|(_, rest)| rest)
            .unwrap_or(dataset_names);

        let thread_id = rayon::current_thread_index().unwrap_or(0) as u64;
        for name in names {
            let dataset = load_dataset(
                &self.config.datasets_path,
                name,
                self.config.test_fraction,
                self.config.random_seed,
            )?;
            let outcome = run_cycle(&dataset, &self.config, self.config.random_seed)?;
            log(
                self.level,
                LogLevel::Normal,
                &format!("{name} done with {:.4}", outcome.fit_score),
            );
            self.scores.push(outcome.fit_score);
            self.records.push(ExperimentResult::from_outcome(&self.config, name, outcome, thread_id));
        }
        Ok(())
    }

    /// Mean fit score over everything fitted so far.
    pub fn score(&self) -> Result<f64> {
        if self.scores.is_empty() {
            return Err(SearchError::EmptyScores);
        }
        Ok(self.scores.iter().sum::<f64>() / self.scores.len() as f64)
    }

    /// The rows to persist, each stamped with the trial-level score mean and
    /// population standard deviation.
    pub fn into_records(self) -> Vec<ExperimentResult> {
        if self.scores.is_empty() {
            return self.records;
        }
        let n = self.scores.len() as f64;
        let mean = self.scores.iter().sum::<f64>() / n;
        let variance = self.scores.iter().map(|score| (score - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        self.records.into_iter().map(|record| record.with_cv_stats(mean, std)).collect()
    }
}
