//! One-shot backfill of the derived global-score columns
//!
//! Older databases carry a single `global_score`/`global_score_norm` pair
//! computed from the weak-inclusive ROC series. The rework replaces that
//! pair with eight explicit columns covering every combination of series,
//! weak handling, and weighting. Against such a database this migration:
//!
//! 1. adds the eight columns as nullable REALs,
//! 2. renames the legacy pair to `*_old`, keeping the values inspectable,
//! 3. recomputes every row's scores from its `metrics_per_al_cycle` blob,
//! 4. rebuilds the table so the new columns are NOT NULL.
//!
//! The migration is deliberately not idempotent: a second run fails on the
//! first step instead of silently rewriting scores.

use rusqlite::params;

use super::sqlite::{ResultStore, CURRENT_VERSION, RESULT_COLUMN_NAMES, RESULT_TABLE_BODY};
use super::{Result, StoreError};
use crate::cycle::{CycleMetrics, DerivedScores};

const DERIVED_COLUMNS: [&str; 8] = [
    "global_score_no_weak_roc_auc",
    "global_score_no_weak_acc",
    "global_score_with_weak_roc_auc",
    "global_score_with_weak_acc",
    "global_score_no_weak_roc_auc_norm",
    "global_score_no_weak_acc_norm",
    "global_score_with_weak_roc_auc_norm",
    "global_score_with_weak_acc_norm",
];

const LEGACY_RENAMES: [(&str, &str); 2] = [
    ("global_score", "global_score_with_weak_roc_auc_old"),
    ("global_score_norm", "global_score_with_weak_roc_auc_norm_old"),
];

/// Migrate a pre-rework database in place. Returns the number of rows whose
/// scores were recomputed.
pub fn migrate_global_scores(store: &mut ResultStore) -> Result<usize> {
    let existing = column_names(store)?;
    for column in DERIVED_COLUMNS {
        if existing.iter().any(|name| name == column) {
            return Err(StoreError::AlreadyMigrated(column.to_string()));
        }
    }
    for (old, _) in LEGACY_RENAMES {
        if !existing.iter().any(|name| name == old) {
            return Err(StoreError::MissingLegacyColumn(old.to_string()));
        }
    }

    let tx = store.conn_mut().transaction()?;

    for column in DERIVED_COLUMNS {
        tx.execute_batch(&format!("ALTER TABLE experimentresult ADD COLUMN {column} REAL"))?;
    }
    for (old, new) in LEGACY_RENAMES {
        tx.execute_batch(&format!("ALTER TABLE experimentresult RENAME COLUMN {old} TO {new}"))?;
    }

    let rows = {
        let mut stmt = tx.prepare(
            "SELECT id, metrics_per_al_cycle, confusion_matrix_test FROM experimentresult",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;
        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        rows
    };

    let migrated = rows.len();
    for (id, blob, cm_blob) in rows {
        let metrics: CycleMetrics = serde_json::from_str(&blob)?;
        // The stored test confusion matrix fixes the class count for the
        // chance-level correction
        let cm_rows: Vec<Vec<usize>> = serde_json::from_str(&cm_blob)?;
        let scores = DerivedScores::from_metrics(&metrics, cm_rows.len())?;
        tx.execute(
            "UPDATE experimentresult SET
                 global_score_no_weak_roc_auc = ?1,
                 global_score_no_weak_acc = ?2,
                 global_score_with_weak_roc_auc = ?3,
                 global_score_with_weak_acc = ?4,
                 global_score_no_weak_roc_auc_norm = ?5,
                 global_score_no_weak_acc_norm = ?6,
                 global_score_with_weak_roc_auc_norm = ?7,
                 global_score_with_weak_acc_norm = ?8
             WHERE id = ?9",
            params![
                scores.global_score_no_weak_roc_auc,
                scores.global_score_no_weak_acc,
                scores.global_score_with_weak_roc_auc,
                scores.global_score_with_weak_acc,
                scores.global_score_no_weak_roc_auc_norm,
                scores.global_score_no_weak_acc_norm,
                scores.global_score_with_weak_roc_auc_norm,
                scores.global_score_with_weak_acc_norm,
                id,
            ],
        )?;
    }

    // SQLite cannot promote an existing column to NOT NULL; rebuild the
    // table from the current schema body and swap it in
    tx.execute_batch(&format!(
        "CREATE TABLE experimentresult_migrated ({RESULT_TABLE_BODY});
         INSERT INTO experimentresult_migrated ({RESULT_COLUMN_NAMES})
             SELECT {RESULT_COLUMN_NAMES} FROM experimentresult;
         DROP TABLE experimentresult;
         ALTER TABLE experimentresult_migrated RENAME TO experimentresult;
         CREATE INDEX IF NOT EXISTS idx_result_param_list ON experimentresult(param_list_id);
         CREATE INDEX IF NOT EXISTS idx_result_dataset ON experimentresult(dataset_name);
         CREATE TABLE IF NOT EXISTS schema_version (
             version TEXT NOT NULL,
             applied_at TEXT NOT NULL DEFAULT (datetime('now'))
         );"
    ))?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", params![CURRENT_VERSION])?;

    tx.commit()?;
    Ok(migrated)
}

fn column_names(store: &ResultStore) -> Result<Vec<String>> {
    let mut stmt = store.conn().prepare("PRAGMA table_info(experimentresult)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::config::ExperimentConfig;
    use crate::data::LabelSource;
    use crate::metrics::{ClassificationReport, ConfusionMatrix};
    use crate::store::ExperimentResult;

    fn fixture_metrics() -> CycleMetrics {
        let report =
            ClassificationReport::from_predictions(&[0, 1, 1, 0], &[0, 1, 0, 0], 2).expect("report");
        let mut metrics = CycleMetrics::default();
        metrics.push(LabelSource::GroundTruth, 3, 1.0, 0.7, report.clone());
        metrics.push(LabelSource::Oracle, 2, 1.0, 0.8, report.clone());
        metrics.push(LabelSource::WeakCertainty, 4, 0.5, 0.85, report);
        metrics
    }

    fn fixture_record(fit_score: f64) -> ExperimentResult {
        let config = ExperimentConfig::default();
        let metrics = fixture_metrics();
        let cm = ConfusionMatrix::from_rows(vec![vec![3, 1], vec![0, 4]]);
        let report = ClassificationReport::from_confusion_matrix(&cm);
        let scores = DerivedScores::from_metrics(&metrics, 2).expect("scores");
        ExperimentResult {
            param_list_id: config.param_list_id(),
            config,
            dataset_name: "dwtc".to_string(),
            metrics,
            amount_of_user_asked_queries: 2,
            experiment_run_date: Utc::now(),
            fit_time: Duration::from_millis(30),
            confusion_matrix_train: cm.clone(),
            confusion_matrix_test: cm,
            classification_report_train: report.clone(),
            classification_report_test: report,
            acc_train: 0.9,
            acc_test: 0.875,
            fit_score,
            roc_auc: 0.85,
            cv_fit_score_mean: None,
            cv_fit_score_std: None,
            thread_id: 0,
            end_time: Utc::now(),
            scores,
        }
    }

    fn legacy_store_with_rows(n: usize) -> ResultStore {
        let store = ResultStore::legacy_in_memory().expect("open");
        for i in 0..n {
            let record = fixture_record(0.5 + 0.1 * i as f64);
            store.insert_legacy(&record, 0.11, 0.22).expect("insert");
        }
        store
    }

    #[test]
    fn test_migrate_backfills_from_blob() {
        let mut store = legacy_store_with_rows(2);
        let migrated = migrate_global_scores(&mut store).expect("migrate");
        assert_eq!(migrated, 2);

        let expected = DerivedScores::from_metrics(&fixture_metrics(), 2).expect("scores");
        let (with_weak_acc, no_weak_acc): (f64, f64) = store
            .conn()
            .query_row(
                "SELECT global_score_with_weak_acc, global_score_no_weak_acc
                 FROM experimentresult WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("query");
        assert!((with_weak_acc - expected.global_score_with_weak_acc).abs() < 1e-12);
        assert!((no_weak_acc - expected.global_score_no_weak_acc).abs() < 1e-12);
    }

    #[test]
    fn test_migrate_renames_legacy_columns() {
        let mut store = legacy_store_with_rows(1);
        migrate_global_scores(&mut store).expect("migrate");

        let names = column_names(&store).expect("columns");
        assert!(names.iter().any(|name| name == "global_score_with_weak_roc_auc_old"));
        assert!(names.iter().any(|name| name == "global_score_with_weak_roc_auc_norm_old"));
        assert!(!names.iter().any(|name| name == "global_score"));

        let old: f64 = store
            .conn()
            .query_row(
                "SELECT global_score_with_weak_roc_auc_old FROM experimentresult WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert!((old - 0.11).abs() < 1e-12);
    }

    #[test]
    fn test_migrate_promotes_not_null() {
        let mut store = legacy_store_with_rows(1);
        migrate_global_scores(&mut store).expect("migrate");

        let notnull: i64 = store
            .conn()
            .query_row(
                "SELECT [notnull] FROM pragma_table_info('experimentresult')
                 WHERE name = 'global_score_with_weak_acc'",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(notnull, 1);
    }

    #[test]
    fn test_migrate_rejects_second_run() {
        let mut store = legacy_store_with_rows(1);
        migrate_global_scores(&mut store).expect("first run");
        let err = migrate_global_scores(&mut store).expect_err("second run");
        assert!(matches!(err, StoreError::AlreadyMigrated(_)));
    }

    #[test]
    fn test_migrate_rejects_current_schema() {
        let mut store = ResultStore::open_in_memory().expect("open");
        let err = migrate_global_scores(&mut store).expect_err("fresh schema");
        assert!(matches!(err, StoreError::AlreadyMigrated(_)));
    }

    #[test]
    fn test_migrated_store_serves_reports() {
        let mut store = legacy_store_with_rows(3);
        migrate_global_scores(&mut store).expect("migrate");

        let ranked = store
            .ranking(2000, crate::store::RankingMetric::GlobalScoreNoWeakAcc, 10)
            .expect("ranking");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].n_runs, 3);
        let top = store.top_by_fit_score(10).expect("top");
        assert_eq!(top.len(), 3);
        assert!((top[0].fit_score - 0.7).abs() < 1e-12);
    }
}
