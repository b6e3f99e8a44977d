//! End-to-end search runs against a file-backed result database

use indagar::cli::LogLevel;
use indagar::config::ExperimentConfig;
use indagar::report::{chart_document, latex_ranking, ranking_table};
use indagar::search::{EvolutionarySearch, RandomSearch};
use indagar::store::{RankingMetric, ResultStore};

fn quick_base(seed: u64) -> ExperimentConfig {
    let mut config = ExperimentConfig::default()
        .with_nr_learning_iterations(2)
        .with_nr_queries_per_iteration(30)
        .with_random_seed(seed);
    config.cores = 2;
    config
}

#[test]
fn test_random_search_persists_to_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("results.db");

    let search = RandomSearch::new(quick_base(7), 3).with_level(LogLevel::Quiet);
    let outcome = {
        let store = ResultStore::open(&db_path).expect("open");
        search.run(&["dwtc".to_string()], &store).expect("run")
    };

    assert_eq!(outcome.trials.len(), 3);
    let ranked = outcome.ranked();
    assert!(!ranked.is_empty());
    assert_eq!(outcome.best_score, ranked[0].score.expect("score"));

    // Rows survive the connection
    let reopened = ResultStore::open(&db_path).expect("reopen");
    let counts = reopened.count_by_dataset().expect("count");
    assert_eq!(counts, vec![("dwtc".to_string(), ranked.len())]);

    let runs = reopened
        .runs_for(&outcome.best_config.param_list_id(), "dwtc")
        .expect("runs");
    assert!(!runs.is_empty());
    assert!(runs[0].metrics().expect("blob").is_consistent());
}

#[test]
fn test_evolutionary_search_covers_generations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ResultStore::open(dir.path().join("evo.db")).expect("open");

    let search = EvolutionarySearch::new(quick_base(13), 3, 2)
        .with_tournament_size(2)
        .with_gene_mutation_prob(0.2)
        .with_level(LogLevel::Quiet);
    let outcome = search.run(&["zebra".to_string()], &store).expect("run");

    // 3 genomes evaluated per generation, 2 generations
    assert_eq!(outcome.trials.len(), 6);
    for trial in &outcome.trials {
        assert!(!trial.config.with_snuba_lite);
    }

    let ranked = outcome.ranked();
    let scores: Vec<f64> = ranked.iter().filter_map(|trial| trial.score).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));

    let counts = store.count_by_dataset().expect("count");
    assert_eq!(counts, vec![("zebra".to_string(), ranked.len())]);
}

#[test]
fn test_search_feeds_every_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ResultStore::open(dir.path().join("report.db")).expect("open");

    RandomSearch::new(quick_base(21), 3)
        .with_level(LogLevel::Quiet)
        .run(&["zebra".to_string()], &store)
        .expect("run");

    let groups = store.ranking(2000, RankingMetric::FitScore, 10).expect("ranking");
    assert!(!groups.is_empty());

    let table = ranking_table(&groups);
    assert!(table.contains("fit score"));
    assert!(table.contains(&groups[0].representative.sampling));

    let latex = latex_ranking(&groups).expect("latex");
    assert!(latex.starts_with("\\begin{tabularx}"));
    assert!(latex.contains("\\bottomrule"));

    let runs = store
        .runs_for(&groups[0].param_list_id, &groups[0].representative.dataset_name)
        .expect("runs");
    let chart = chart_document(&runs).expect("chart");
    assert_eq!(chart["$schema"], "https://vega.github.io/schema/vega-lite/v5.json");
    assert!(!chart["vconcat"].as_array().expect("rows").is_empty());
}

#[test]
fn test_reruns_reproduce_trial_configurations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ResultStore::open(dir.path().join("repro.db")).expect("open");

    let first = RandomSearch::new(quick_base(5), 2)
        .with_level(LogLevel::Quiet)
        .run(&["dwtc".to_string()], &store)
        .expect("first");
    let second = RandomSearch::new(quick_base(5), 2)
        .with_level(LogLevel::Quiet)
        .run(&["dwtc".to_string()], &store)
        .expect("second");

    for (a, b) in first.trials.iter().zip(&second.trials) {
        assert_eq!(a.config.param_list_id(), b.config.param_list_id());
    }
    assert_eq!(first.best_score, second.best_score);
}
