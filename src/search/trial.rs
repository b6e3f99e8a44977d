//! Trial bookkeeping shared by both drivers

use crate::config::ExperimentConfig;

/// Evaluation state of one sampled configuration
#[derive(Clone, Debug, PartialEq)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    /// Evaluation error; the message survives into the outcome report
    Failed(String),
}

/// One sampled configuration and what became of it
#[derive(Clone, Debug)]
pub struct Trial {
    pub id: usize,
    pub config: ExperimentConfig,
    /// Mean fit score over the dataset list, `None` until completed
    pub score: Option<f64>,
    pub status: TrialStatus,
}

impl Trial {
    pub fn new(id: usize, config: ExperimentConfig) -> Self {
        Self { id, config, score: None, status: TrialStatus::Pending }
    }

    pub fn complete(&mut self, score: f64) {
        self.score = Some(score);
        self.status = TrialStatus::Completed;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.score = None;
        self.status = TrialStatus::Failed(error.into());
    }

    pub fn is_completed(&self) -> bool {
        self.status == TrialStatus::Completed
    }
}

/// What a driver run produced
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub best_config: ExperimentConfig,
    pub best_score: f64,
    /// Every trial, evaluation order, failures included
    pub trials: Vec<Trial>,
}

impl SearchOutcome {
    /// Completed trials, best score first
    pub fn ranked(&self) -> Vec<&Trial> {
        let mut completed: Vec<&Trial> =
            self.trials.iter().filter(|trial| trial.is_completed()).collect();
        completed.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
        });
        completed
    }

    /// Trials that errored out, with their messages
    pub fn failures(&self) -> Vec<(usize, &str)> {
        self.trials
            .iter()
            .filter_map(|trial| match &trial.status {
                TrialStatus::Failed(why) => Some((trial.id, why.as_str())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_lifecycle() {
        let mut trial = Trial::new(3, ExperimentConfig::default());
        assert_eq!(trial.status, TrialStatus::Pending);
        assert!(!trial.is_completed());

        trial.complete(0.75);
        assert!(trial.is_completed());
        assert_eq!(trial.score, Some(0.75));
    }

    #[test]
    fn test_failed_trial_keeps_message() {
        let mut trial = Trial::new(0, ExperimentConfig::default());
        trial.fail("dataset vanished");
        assert_eq!(trial.status, TrialStatus::Failed("dataset vanished".to_string()));
        assert_eq!(trial.score, None);
        assert!(!trial.is_completed());
    }

    #[test]
    fn test_ranked_sorts_completed_descending() {
        let mut trials = Vec::new();
        for (id, score) in [(0, 0.4), (1, 0.9), (2, 0.6)] {
            let mut trial = Trial::new(id, ExperimentConfig::default());
            trial.complete(score);
            trials.push(trial);
        }
        let mut failed = Trial::new(3, ExperimentConfig::default());
        failed.fail("boom");
        trials.push(failed);

        let outcome = SearchOutcome {
            best_config: ExperimentConfig::default(),
            best_score: 0.9,
            trials,
        };
        let ranked = outcome.ranked();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].id, 1);
        assert_eq!(ranked[2].id, 0);
        assert_eq!(outcome.failures(), vec![(3, "boom")]);
    }
}
