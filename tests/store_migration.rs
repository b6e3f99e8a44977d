//! File-backed store lifecycle and the legacy score migration

use indagar::config::ExperimentConfig;
use indagar::cycle::run_cycle;
use indagar::data::load_dataset;
use indagar::store::{
    migrate_global_scores, ExperimentResult, RankingMetric, ResultStore, StoreError,
};

/// One real finished run, small enough to simulate in a test
fn real_record(seed: u64) -> ExperimentResult {
    let config = ExperimentConfig::default()
        .with_nr_learning_iterations(2)
        .with_nr_queries_per_iteration(40)
        .with_random_seed(seed);
    let dataset = load_dataset("/nonexistent", "dwtc", config.test_fraction, seed).expect("dataset");
    let outcome = run_cycle(&dataset, &config, seed).expect("cycle");
    ExperimentResult::from_outcome(&config, "dwtc", outcome, 0)
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("results.db");
    let record = real_record(42);

    {
        let store = ResultStore::open(&db_path).expect("open");
        store.insert(&record).expect("insert");
    }

    let store = ResultStore::open(&db_path).expect("reopen");
    let runs = store.runs_for(&record.param_list_id, "dwtc").expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].metrics().expect("blob"), record.metrics);
    assert!((runs[0].fit_score - record.fit_score).abs() < 1e-12);
}

#[test]
fn test_legacy_file_migrates_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("legacy.db");

    let records = [real_record(1), real_record(2)];
    {
        let store = ResultStore::open_legacy(&db_path).expect("open legacy");
        for record in &records {
            store.insert_legacy(record, 0.3, 0.4).expect("insert");
        }
    }

    // The migrate command opens the file as-is, no schema init
    let mut store = ResultStore::open_existing(&db_path).expect("open existing");
    let migrated = migrate_global_scores(&mut store).expect("migrate");
    assert_eq!(migrated, 2);

    // Backfilled scores match a fresh computation from the stored blob
    let ranked = store
        .ranking(1_000_000, RankingMetric::GlobalScoreNoWeakAcc, 10)
        .expect("ranking");
    let total_runs: usize = ranked.iter().map(|group| group.n_runs).sum();
    assert_eq!(total_runs, 2);

    let again = migrate_global_scores(&mut store).expect_err("second run");
    assert!(matches!(again, StoreError::AlreadyMigrated(_)));
}

#[test]
fn test_migration_rejects_current_schema_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("fresh.db");
    {
        ResultStore::open(&db_path).expect("open");
    }
    let mut store = ResultStore::open_existing(&db_path).expect("open existing");
    let err = migrate_global_scores(&mut store).expect_err("fresh schema");
    assert!(matches!(err, StoreError::AlreadyMigrated(_)));
}

#[test]
fn test_repeated_runs_group_under_one_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ResultStore::open(dir.path().join("groups.db")).expect("open");

    // Same hyperparameters under different seeds group together
    let a = real_record(1);
    let b = real_record(2);
    assert_eq!(a.param_list_id, b.param_list_id);
    store.insert(&a).expect("insert");
    store.insert(&b).expect("insert");

    let ranked = store.ranking(1_000_000, RankingMetric::FitScore, 10).expect("ranking");
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].n_runs, 2);
    let expected = (a.fit_score + b.fit_score) / 2.0;
    assert!((ranked[0].avg_fit_score - expected).abs() < 1e-9);
}
