//! The simulation loop

use std::time::{Duration, Instant};

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::cluster::ClusterContext;
use crate::config::ExperimentConfig;
use crate::data::{Dataset, LabelSource, PoolSet};
use crate::metrics::{roc_auc_score, ClassificationReport, ConfusionMatrix, MetricsError};
use crate::model::{Classifier, ClassifierKind};
use crate::sampling::{least_confidence, QueryContext};

use super::log::CycleMetrics;
use super::recommend::{certainty_recommendation, cluster_recommendation};
use super::score::DerivedScores;
use super::stopping::StoppingState;
use super::{CycleError, Result};

/// Everything a finished cycle reports
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    /// Per-iteration log, stored as the `metrics_per_al_cycle` blob
    pub metrics: CycleMetrics,
    pub scores: DerivedScores,
    /// Fitness reported to the search driver
    pub fit_score: f64,
    /// Points the oracle was asked to label
    pub amount_of_user_asked_queries: usize,
    pub acc_train: f64,
    pub acc_test: f64,
    /// Test-split ROC-AUC of the final model
    pub roc_auc: f64,
    pub confusion_matrix_train: ConfusionMatrix,
    pub confusion_matrix_test: ConfusionMatrix,
    pub classification_report_train: ClassificationReport,
    pub classification_report_test: ClassificationReport,
    /// Wall time of the whole simulation
    pub fit_time: Duration,
}

/// A labeled batch awaiting its post-retrain evaluation
struct PendingBatch {
    source: LabelSource,
    assignments: Vec<(usize, usize)>,
    /// Mean least-confidence of the batch at selection time
    mean_uncertainty: f64,
}

/// Simulate one active-learning run.
///
/// Every iteration retrains on the labeled pool, logs the evaluation of the
/// batch labeled in the previous step, then picks the next batch: a weak
/// recommendation when enabled and accepted, otherwise an oracle query. The
/// run ends when the pool is exhausted, the iteration cap is reached, or a
/// stopping criterion fires with no further weak labels allowed or produced.
pub fn run_cycle(dataset: &Dataset, config: &ExperimentConfig, seed: u64) -> Result<CycleOutcome> {
    config.validate()?;
    if config.with_snuba_lite {
        return Err(CycleError::SnubaLiteUnsupported);
    }
    let n_classes = dataset.n_classes();
    if n_classes < 2 {
        return Err(CycleError::TooFewClasses(n_classes));
    }

    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let n_train = dataset.x_train.nrows();

    let mut pools = PoolSet::new(n_train);
    let seed_batch = seed_assignments(dataset, config, &mut rng);
    pools.label_batch(&seed_batch, &dataset.y_train, LabelSource::GroundTruth)?;

    let clusters = ClusterContext::build(dataset.x_train.view(), n_classes, seed)?;
    let mut metrics = CycleMetrics::new();
    let mut stopping = StoppingState::new();
    let mut asked_queries = 0usize;
    let mut iterations = 0usize;

    let mut model = config.classifier.build(n_classes);
    // The seed counts as iteration zero; no model existed when it was
    // chosen, so its uncertainty is pinned to the maximum
    let mut batch = PendingBatch {
        source: LabelSource::GroundTruth,
        assignments: seed_batch,
        mean_uncertainty: 1.0,
    };

    loop {
        let (x_labeled, y_labeled) = pools.labeled_xy(dataset.x_train.view());
        model.fit(x_labeled.view(), &y_labeled)?;

        let y_test_pred = model.predict(dataset.x_test.view())?;
        let test_report =
            ClassificationReport::from_predictions(&y_test_pred, &dataset.y_test, n_classes)?;
        let test_acc = test_report.accuracy;
        let roc_value = roc_series_value(model.as_ref(), dataset, &pools)?;

        metrics.push(
            batch.source,
            batch.assignments.len(),
            strong_accuracy(&batch.assignments, &dataset.y_train),
            roc_value,
            test_report,
        );
        let stopped = stopping.update(batch.mean_uncertainty, test_acc, config);
        iterations += 1;

        if pools.is_exhausted() || iterations >= config.nr_learning_iterations {
            break;
        }

        let unlabeled_x = pools.unlabeled_x(dataset.x_train.view());
        let proba = model.predict_proba(unlabeled_x.view())?;

        let gate_open = test_acc >= config.minimum_test_accuracy_before_recommendations
            && (!stopped || config.allow_recommendations_after_stop);
        let mut recommendation = None;
        if gate_open && config.with_cluster_recommendation {
            recommendation = cluster_recommendation(&pools, &clusters, n_classes, config);
        }
        if gate_open && recommendation.is_none() && config.with_uncertainty_recommendation {
            recommendation = certainty_recommendation(pools.unlabeled(), proba.view(), config);
        }

        batch = match recommendation {
            Some(rec) => {
                let mean_uncertainty =
                    batch_uncertainty(&rec.assignments, pools.unlabeled(), proba.view());
                pools.label_batch(&rec.assignments, &dataset.y_train, rec.source)?;
                PendingBatch {
                    source: rec.source,
                    assignments: rec.assignments,
                    mean_uncertainty,
                }
            }
            None => {
                if stopped {
                    break;
                }
                let assignments = oracle_query(
                    dataset,
                    config,
                    &pools,
                    &clusters,
                    x_labeled.view(),
                    &y_labeled,
                    unlabeled_x.view(),
                    proba.view(),
                    iterations,
                    &mut rng,
                )?;
                let mean_uncertainty =
                    batch_uncertainty(&assignments, pools.unlabeled(), proba.view());
                asked_queries +=
                    pools.label_batch(&assignments, &dataset.y_train, LabelSource::Oracle)?;
                PendingBatch {
                    source: LabelSource::Oracle,
                    assignments,
                    mean_uncertainty,
                }
            }
        };
    }

    let y_train_pred = model.predict(dataset.x_train.view())?;
    let confusion_matrix_train =
        ConfusionMatrix::from_predictions(&y_train_pred, &dataset.y_train, n_classes)?;
    let classification_report_train =
        ClassificationReport::from_confusion_matrix(&confusion_matrix_train);

    let y_test_pred = model.predict(dataset.x_test.view())?;
    let confusion_matrix_test =
        ConfusionMatrix::from_predictions(&y_test_pred, &dataset.y_test, n_classes)?;
    let classification_report_test =
        ClassificationReport::from_confusion_matrix(&confusion_matrix_test);

    let test_proba = model.predict_proba(dataset.x_test.view())?;
    let roc_auc = roc_auc_score(test_proba.view(), &dataset.y_test)?;

    let scores = DerivedScores::from_metrics(&metrics, n_classes)?;

    Ok(CycleOutcome {
        fit_score: scores.fit_score(),
        scores,
        amount_of_user_asked_queries: asked_queries,
        acc_train: confusion_matrix_train.accuracy(),
        acc_test: confusion_matrix_test.accuracy(),
        roc_auc,
        confusion_matrix_train,
        confusion_matrix_test,
        classification_report_train,
        classification_report_test,
        fit_time: started.elapsed(),
        metrics,
    })
}

/// Seed indices: one per class where possible, filled randomly up to
/// `max(ceil(start_set_size * n_train), n_classes)`
fn seed_assignments(
    dataset: &Dataset,
    config: &ExperimentConfig,
    rng: &mut StdRng,
) -> Vec<(usize, usize)> {
    let n_train = dataset.x_train.nrows();
    let n_classes = dataset.n_classes();
    let target = ((config.start_set_size * n_train as f64).ceil() as usize)
        .max(n_classes)
        .min(n_train);

    let mut order: Vec<usize> = (0..n_train).collect();
    order.shuffle(rng);

    let mut chosen = Vec::with_capacity(target);
    let mut picked = vec![false; n_train];
    let mut class_seen = vec![false; n_classes];
    for &index in &order {
        let class = dataset.y_train[index];
        if !class_seen[class] {
            class_seen[class] = true;
            picked[index] = true;
            chosen.push(index);
        }
    }
    for &index in &order {
        if chosen.len() >= target {
            break;
        }
        if !picked[index] {
            picked[index] = true;
            chosen.push(index);
        }
    }

    chosen.sort_unstable();
    chosen
        .into_iter()
        .map(|index| (index, dataset.y_train[index]))
        .collect()
}

/// Pick the next oracle batch: the cluster strategy narrows the candidates,
/// the sampler ranks them, the top of the ranking is labeled with ground
/// truth.
#[allow(clippy::too_many_arguments)]
fn oracle_query(
    dataset: &Dataset,
    config: &ExperimentConfig,
    pools: &PoolSet,
    clusters: &ClusterContext,
    x_labeled: ArrayView2<'_, f64>,
    y_labeled: &[usize],
    unlabeled_x: ArrayView2<'_, f64>,
    proba: ArrayView2<'_, f64>,
    iteration: usize,
    rng: &mut StdRng,
) -> Result<Vec<(usize, usize)>> {
    let unlabeled = pools.unlabeled();
    let candidates = clusters.candidates(config.cluster, unlabeled, proba, iteration, rng);

    let candidate_proba = select_rows(proba, &candidates);
    let candidate_x = select_rows(unlabeled_x, &candidates);
    let votes = if config.sampling.needs_committee() {
        Some(committee_votes(
            x_labeled,
            y_labeled,
            candidate_x.view(),
            dataset.n_classes(),
        )?)
    } else {
        None
    };

    let context = QueryContext {
        proba: candidate_proba.view(),
        features: candidate_x.view(),
        committee_votes: votes.as_deref(),
    };
    let ranked = config.sampling.rank(&context, rng)?;

    let take = config.nr_queries_per_iteration.min(ranked.len());
    let mut assignments = Vec::with_capacity(take);
    for &rank_position in ranked.iter().take(take) {
        let index = unlabeled[candidates[rank_position]];
        assignments.push((index, dataset.y_train[index]));
    }
    Ok(assignments)
}

/// One vote per committee member (naive Bayes and kNN) per candidate
fn committee_votes(
    x_labeled: ArrayView2<'_, f64>,
    y_labeled: &[usize],
    candidate_x: ArrayView2<'_, f64>,
    n_classes: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut votes = vec![Vec::with_capacity(2); candidate_x.nrows()];
    for kind in [ClassifierKind::NaiveBayes, ClassifierKind::Knn] {
        let mut member = kind.build(n_classes);
        member.fit(x_labeled, y_labeled)?;
        for (row, vote) in member.predict(candidate_x)?.into_iter().enumerate() {
            votes[row].push(vote);
        }
    }
    Ok(votes)
}

fn select_rows(matrix: ArrayView2<'_, f64>, rows: &[usize]) -> Array2<f64> {
    let mut out = Array2::zeros((rows.len(), matrix.ncols()));
    for (target, &source) in rows.iter().enumerate() {
        out.row_mut(target).assign(&matrix.row(source));
    }
    out
}

/// Mean least-confidence of a batch, looked up by pool position
fn batch_uncertainty(
    assignments: &[(usize, usize)],
    unlabeled: &[usize],
    proba: ArrayView2<'_, f64>,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for &(index, _) in assignments {
        if let Ok(position) = unlabeled.binary_search(&index) {
            total += least_confidence(&proba.row(position).to_vec());
            count += 1;
        }
    }
    if count == 0 {
        1.0
    } else {
        total / count as f64
    }
}

/// Share of assigned labels matching ground truth
fn strong_accuracy(assignments: &[(usize, usize)], y_true: &[usize]) -> f64 {
    if assignments.is_empty() {
        return 1.0;
    }
    let correct = assignments
        .iter()
        .filter(|&&(index, label)| y_true[index] == label)
        .count();
    correct as f64 / assignments.len() as f64
}

/// ROC-AUC on the unlabeled pool while it is non-empty and multi-class,
/// otherwise on the test split
fn roc_series_value(
    model: &dyn Classifier,
    dataset: &Dataset,
    pools: &PoolSet,
) -> Result<f64> {
    if !pools.is_exhausted() {
        let x = pools.unlabeled_x(dataset.x_train.view());
        let proba = model.predict_proba(x.view())?;
        let y = pools.unlabeled_y_true(&dataset.y_train);
        match roc_auc_score(proba.view(), &y) {
            Ok(value) => return Ok(value),
            Err(MetricsError::SingleClass) => {}
            Err(err) => return Err(err.into()),
        }
    }
    let proba = model.predict_proba(dataset.x_test.view())?;
    Ok(roc_auc_score(proba.view(), &dataset.y_test)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SamplerKind;
    use ndarray::Array2;

    /// Two well-separated Gaussian-free blobs, alternating train/test rows
    fn blob_dataset(per_class: usize) -> Dataset {
        let centers = [(0.0, 0.0), (8.0, 8.0)];
        let mut rows = Vec::new();
        for class in 0..2 {
            for i in 0..per_class {
                let jitter = 0.05 * (i % 7) as f64;
                let (cx, cy) = centers[class];
                rows.push(([cx + jitter, cy - jitter], class));
            }
        }

        let mut x_train = Vec::new();
        let mut y_train = Vec::new();
        let mut x_test = Vec::new();
        let mut y_test = Vec::new();
        for (i, (point, class)) in rows.into_iter().enumerate() {
            if i % 4 == 0 {
                x_test.extend_from_slice(&point);
                y_test.push(class);
            } else {
                x_train.extend_from_slice(&point);
                y_train.push(class);
            }
        }

        Dataset {
            name: "blobs".to_string(),
            x_train: Array2::from_shape_vec((y_train.len(), 2), x_train).expect("train shape"),
            y_train,
            x_test: Array2::from_shape_vec((y_test.len(), 2), x_test).expect("test shape"),
            y_test,
            label_names: vec!["a".to_string(), "b".to_string()],
        }
    }

    fn base_config() -> ExperimentConfig {
        ExperimentConfig {
            nr_queries_per_iteration: 5,
            start_set_size: 0.1,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_cycle_consumes_the_pool() {
        let dataset = blob_dataset(20);
        let outcome = run_cycle(&dataset, &base_config(), 42).expect("cycle");

        let n_train = dataset.y_train.len();
        assert!(outcome.metrics.is_consistent());
        assert_eq!(
            outcome.metrics.query_length.iter().sum::<usize>(),
            n_train
        );
        assert!(outcome.metrics.query_length.iter().all(|&q| q >= 1));
        assert_eq!(outcome.metrics.recommendation[0], LabelSource::GroundTruth);
    }

    #[test]
    fn test_oracle_counter_matches_log() {
        let dataset = blob_dataset(20);
        let outcome = run_cycle(&dataset, &base_config(), 7).expect("cycle");
        assert_eq!(
            outcome.amount_of_user_asked_queries,
            outcome.metrics.oracle_query_total()
        );
        assert!(outcome.amount_of_user_asked_queries > 0);
    }

    #[test]
    fn test_seed_and_oracle_labels_are_true() {
        let dataset = blob_dataset(20);
        let outcome = run_cycle(&dataset, &base_config(), 3).expect("cycle");
        for (source, strong_acc) in outcome
            .metrics
            .recommendation
            .iter()
            .zip(&outcome.metrics.query_strong_accuracy_list)
        {
            if !source.is_weak() {
                assert!((strong_acc - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_separable_blobs_learn_well() {
        let dataset = blob_dataset(20);
        let outcome = run_cycle(&dataset, &base_config(), 42).expect("cycle");
        assert!(outcome.acc_test > 0.9);
        assert!(outcome.roc_auc > 0.9);
        assert!(outcome.fit_score > 0.5);
        assert!(outcome.fit_score <= 1.0 + 1e-9);
    }

    #[test]
    fn test_certainty_recommendation_fires() {
        let dataset = blob_dataset(30);
        let config = ExperimentConfig {
            with_uncertainty_recommendation: true,
            minimum_test_accuracy_before_recommendations: 0.0,
            uncertainty_recommendation_certainty_threshold: 0.6,
            uncertainty_recommendation_ratio: 1.0,
            ..base_config()
        };
        let outcome = run_cycle(&dataset, &config, 42).expect("cycle");
        assert!(outcome.metrics.count_source(LabelSource::WeakCertainty) >= 1);
        // Clean blobs: certainty labels them all before the oracle is needed
        assert_eq!(outcome.amount_of_user_asked_queries, 0);
    }

    #[test]
    fn test_stopping_ends_the_run() {
        let dataset = blob_dataset(40);
        let config = ExperimentConfig {
            nr_queries_per_iteration: 2,
            stopping_criteria_acc: 0.0,
            ..base_config()
        };
        let outcome = run_cycle(&dataset, &config, 42).expect("cycle");
        // The window fills after five iterations, then the run stops
        assert_eq!(outcome.metrics.len(), 5);
        assert!(outcome.metrics.query_length.iter().sum::<usize>() < dataset.y_train.len());
    }

    #[test]
    fn test_iteration_cap() {
        let dataset = blob_dataset(40);
        let config = ExperimentConfig {
            nr_learning_iterations: 3,
            nr_queries_per_iteration: 1,
            ..base_config()
        };
        let outcome = run_cycle(&dataset, &config, 42).expect("cycle");
        assert_eq!(outcome.metrics.len(), 3);
    }

    #[test]
    fn test_snuba_lite_rejected() {
        let dataset = blob_dataset(10);
        let config = ExperimentConfig {
            with_snuba_lite: true,
            ..base_config()
        };
        assert!(matches!(
            run_cycle(&dataset, &config, 42),
            Err(CycleError::SnubaLiteUnsupported)
        ));
    }

    #[test]
    fn test_committee_sampler_runs() {
        let dataset = blob_dataset(15);
        let config = ExperimentConfig {
            sampling: SamplerKind::Committee,
            ..base_config()
        };
        let outcome = run_cycle(&dataset, &config, 42).expect("cycle");
        assert!(outcome.metrics.len() >= 2);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let dataset = blob_dataset(20);
        let config = base_config();
        let a = run_cycle(&dataset, &config, 11).expect("cycle");
        let b = run_cycle(&dataset, &config, 11).expect("cycle");
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.amount_of_user_asked_queries, b.amount_of_user_asked_queries);
    }
}
