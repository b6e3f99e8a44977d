//! Windowed stopping criteria

use std::collections::VecDeque;

use crate::config::ExperimentConfig;

/// Iterations every criterion looks back over
const WINDOW: usize = 5;

/// Tracks recent query uncertainty and test accuracy.
///
/// Criteria are evaluated only once the window is full; once any criterion
/// fires the state stays stopped. The engine keeps recommending weak labels
/// after a stop when the configuration allows it, but never asks the oracle
/// again.
#[derive(Clone, Debug, Default)]
pub struct StoppingState {
    uncertainties: VecDeque<f64>,
    accuracies: VecDeque<f64>,
    stopped: bool,
}

impl StoppingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Record one iteration and re-evaluate. Returns the stopped flag.
    pub fn update(
        &mut self,
        query_uncertainty: f64,
        test_accuracy: f64,
        config: &ExperimentConfig,
    ) -> bool {
        push_window(&mut self.uncertainties, query_uncertainty);
        push_window(&mut self.accuracies, test_accuracy);

        if self.stopped || self.accuracies.len() < WINDOW {
            return self.stopped;
        }

        let mean_uncertainty = mean(&self.uncertainties);
        let mean_accuracy = mean(&self.accuracies);
        let std_accuracy = std(&self.accuracies, mean_accuracy);

        if mean_uncertainty < config.stopping_criteria_uncertainty
            || mean_accuracy >= config.stopping_criteria_acc
            || std_accuracy < config.stopping_criteria_std
        {
            self.stopped = true;
        }
        self.stopped
    }
}

fn push_window(window: &mut VecDeque<f64>, value: f64) {
    if window.len() == WINDOW {
        window.pop_front();
    }
    window.push_back(value);
}

fn mean(window: &VecDeque<f64>) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

fn std(window: &VecDeque<f64>, mean: f64) -> f64 {
    let variance = window
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / window.len() as f64;
    variance.sqrt()
}
