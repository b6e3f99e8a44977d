//! Connection handling, schema, inserts, and the ranking queries

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{named_params, params, Connection, Row};

use super::{ExperimentResult, Result, StoreError};
use crate::cycle::CycleMetrics;

/// Stamped into `schema_version` by `open` and by the migration
pub(crate) const CURRENT_VERSION: &str = "2";
/// Stamped by `open_legacy` for pre-rework databases
const LEGACY_VERSION: &str = "1";

/// Column definitions of the current `experimentresult` table.
///
/// Shared with the migration, which rebuilds the table from this exact body
/// to promote the backfilled score columns to NOT NULL.
pub(crate) const RESULT_TABLE_BODY: &str = "
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    datasets_path TEXT NOT NULL,
    dataset_name TEXT NOT NULL,
    db_name_or_type TEXT NOT NULL,
    classifier TEXT NOT NULL,
    cores INTEGER NOT NULL,
    test_fraction REAL NOT NULL,
    sampling TEXT NOT NULL,
    random_seed INTEGER NOT NULL,
    cluster TEXT NOT NULL,
    nr_learning_iterations INTEGER NOT NULL,
    nr_queries_per_iteration INTEGER NOT NULL,
    start_set_size REAL NOT NULL,
    with_uncertainty_recommendation INTEGER NOT NULL,
    with_cluster_recommendation INTEGER NOT NULL,
    with_snuba_lite INTEGER NOT NULL,
    minimum_test_accuracy_before_recommendations REAL NOT NULL,
    uncertainty_recommendation_certainty_threshold REAL,
    uncertainty_recommendation_ratio REAL,
    snuba_lite_minimum_heuristic_accuracy REAL,
    cluster_recommendation_minimum_cluster_unity_size REAL,
    cluster_recommendation_ratio_labeled_unlabeled REAL,
    allow_recommendations_after_stop INTEGER NOT NULL,
    stopping_criteria_uncertainty REAL NOT NULL,
    stopping_criteria_acc REAL NOT NULL,
    stopping_criteria_std REAL NOT NULL,
    metrics_per_al_cycle TEXT NOT NULL,
    amount_of_user_asked_queries INTEGER NOT NULL,
    experiment_run_date TEXT NOT NULL,
    fit_time TEXT NOT NULL,
    confusion_matrix_train TEXT NOT NULL,
    confusion_matrix_test TEXT NOT NULL,
    classification_report_train TEXT NOT NULL,
    classification_report_test TEXT NOT NULL,
    acc_train REAL NOT NULL,
    acc_test REAL NOT NULL,
    fit_score REAL NOT NULL,
    roc_auc REAL NOT NULL,
    param_list_id TEXT NOT NULL,
    cv_fit_score_mean REAL,
    cv_fit_score_std REAL,
    thread_id INTEGER NOT NULL,
    end_time TEXT NOT NULL,
    global_score_with_weak_roc_auc_old REAL,
    global_score_with_weak_roc_auc_norm_old REAL,
    global_score_no_weak_roc_auc REAL NOT NULL,
    global_score_no_weak_acc REAL NOT NULL,
    global_score_with_weak_roc_auc REAL NOT NULL,
    global_score_with_weak_acc REAL NOT NULL,
    global_score_no_weak_roc_auc_norm REAL NOT NULL,
    global_score_no_weak_acc_norm REAL NOT NULL,
    global_score_with_weak_roc_auc_norm REAL NOT NULL,
    global_score_with_weak_acc_norm REAL NOT NULL
";

/// Same table before the score rework: one legacy score pair, no derived
/// columns. Only reachable through the `open_legacy` constructors.
const LEGACY_TABLE_BODY: &str = "
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    datasets_path TEXT NOT NULL,
    dataset_name TEXT NOT NULL,
    db_name_or_type TEXT NOT NULL,
    classifier TEXT NOT NULL,
    cores INTEGER NOT NULL,
    test_fraction REAL NOT NULL,
    sampling TEXT NOT NULL,
    random_seed INTEGER NOT NULL,
    cluster TEXT NOT NULL,
    nr_learning_iterations INTEGER NOT NULL,
    nr_queries_per_iteration INTEGER NOT NULL,
    start_set_size REAL NOT NULL,
    with_uncertainty_recommendation INTEGER NOT NULL,
    with_cluster_recommendation INTEGER NOT NULL,
    with_snuba_lite INTEGER NOT NULL,
    minimum_test_accuracy_before_recommendations REAL NOT NULL,
    uncertainty_recommendation_certainty_threshold REAL,
    uncertainty_recommendation_ratio REAL,
    snuba_lite_minimum_heuristic_accuracy REAL,
    cluster_recommendation_minimum_cluster_unity_size REAL,
    cluster_recommendation_ratio_labeled_unlabeled REAL,
    allow_recommendations_after_stop INTEGER NOT NULL,
    stopping_criteria_uncertainty REAL NOT NULL,
    stopping_criteria_acc REAL NOT NULL,
    stopping_criteria_std REAL NOT NULL,
    metrics_per_al_cycle TEXT NOT NULL,
    amount_of_user_asked_queries INTEGER NOT NULL,
    experiment_run_date TEXT NOT NULL,
    fit_time TEXT NOT NULL,
    confusion_matrix_train TEXT NOT NULL,
    confusion_matrix_test TEXT NOT NULL,
    classification_report_train TEXT NOT NULL,
    classification_report_test TEXT NOT NULL,
    acc_train REAL NOT NULL,
    acc_test REAL NOT NULL,
    fit_score REAL NOT NULL,
    roc_auc REAL NOT NULL,
    param_list_id TEXT NOT NULL,
    cv_fit_score_mean REAL,
    cv_fit_score_std REAL,
    thread_id INTEGER NOT NULL,
    end_time TEXT NOT NULL,
    global_score REAL NOT NULL,
    global_score_norm REAL NOT NULL
";

/// Every column of the current table, in declaration order
pub(crate) const RESULT_COLUMN_NAMES: &str = "id, datasets_path, dataset_name, db_name_or_type, \
    classifier, cores, test_fraction, sampling, random_seed, cluster, nr_learning_iterations, \
    nr_queries_per_iteration, start_set_size, with_uncertainty_recommendation, \
    with_cluster_recommendation, with_snuba_lite, minimum_test_accuracy_before_recommendations, \
    uncertainty_recommendation_certainty_threshold, uncertainty_recommendation_ratio, \
    snuba_lite_minimum_heuristic_accuracy, cluster_recommendation_minimum_cluster_unity_size, \
    cluster_recommendation_ratio_labeled_unlabeled, allow_recommendations_after_stop, \
    stopping_criteria_uncertainty, stopping_criteria_acc, stopping_criteria_std, \
    metrics_per_al_cycle, amount_of_user_asked_queries, experiment_run_date, fit_time, \
    confusion_matrix_train, confusion_matrix_test, classification_report_train, \
    classification_report_test, acc_train, acc_test, fit_score, roc_auc, param_list_id, \
    cv_fit_score_mean, cv_fit_score_std, thread_id, end_time, \
    global_score_with_weak_roc_auc_old, global_score_with_weak_roc_auc_norm_old, \
    global_score_no_weak_roc_auc, global_score_no_weak_acc, global_score_with_weak_roc_auc, \
    global_score_with_weak_acc, global_score_no_weak_roc_auc_norm, global_score_no_weak_acc_norm, \
    global_score_with_weak_roc_auc_norm, global_score_with_weak_acc_norm";

/// Columns read back for reporting, in `StoredRun::from_row` order
const RUN_COLUMNS: &str = "id, dataset_name, classifier, sampling, cluster, \
    nr_queries_per_iteration, start_set_size, with_uncertainty_recommendation, \
    with_cluster_recommendation, uncertainty_recommendation_certainty_threshold, \
    uncertainty_recommendation_ratio, cluster_recommendation_minimum_cluster_unity_size, \
    cluster_recommendation_ratio_labeled_unlabeled, allow_recommendations_after_stop, \
    stopping_criteria_uncertainty, stopping_criteria_acc, stopping_criteria_std, \
    metrics_per_al_cycle, amount_of_user_asked_queries, acc_test, fit_score, roc_auc, \
    param_list_id";

/// Aggregation target for the grouped ranking query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankingMetric {
    FitScore,
    GlobalScoreNoWeakAcc,
    AmountOfUserAskedQueries,
}

impl RankingMetric {
    /// Column the query averages and orders by
    pub fn column(self) -> &'static str {
        match self {
            RankingMetric::FitScore => "fit_score",
            RankingMetric::GlobalScoreNoWeakAcc => "global_score_no_weak_acc",
            RankingMetric::AmountOfUserAskedQueries => "amount_of_user_asked_queries",
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for RankingMetric {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fit_score" => Ok(RankingMetric::FitScore),
            "global_score_no_weak_acc" => Ok(RankingMetric::GlobalScoreNoWeakAcc),
            "amount_of_user_asked_queries" => Ok(RankingMetric::AmountOfUserAskedQueries),
            other => Err(StoreError::UnknownMetric(other.to_string())),
        }
    }
}

/// One persisted run, as read back for the reports
#[derive(Clone, Debug)]
pub struct StoredRun {
    pub id: i64,
    pub dataset_name: String,
    pub classifier: String,
    pub sampling: String,
    pub cluster: String,
    pub nr_queries_per_iteration: usize,
    pub start_set_size: f64,
    pub with_uncertainty_recommendation: bool,
    pub with_cluster_recommendation: bool,
    pub uncertainty_recommendation_certainty_threshold: Option<f64>,
    pub uncertainty_recommendation_ratio: Option<f64>,
    pub cluster_recommendation_minimum_cluster_unity_size: Option<f64>,
    pub cluster_recommendation_ratio_labeled_unlabeled: Option<f64>,
    pub allow_recommendations_after_stop: bool,
    pub stopping_criteria_uncertainty: f64,
    pub stopping_criteria_acc: f64,
    pub stopping_criteria_std: f64,
    /// Raw per-iteration blob; parse on demand with [`StoredRun::metrics`]
    pub metrics_per_al_cycle: String,
    pub amount_of_user_asked_queries: usize,
    pub acc_test: f64,
    pub fit_score: f64,
    pub roc_auc: f64,
    pub param_list_id: String,
}

impl StoredRun {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            dataset_name: row.get(1)?,
            classifier: row.get(2)?,
            sampling: row.get(3)?,
            cluster: row.get(4)?,
            nr_queries_per_iteration: row.get::<_, i64>(5)? as usize,
            start_set_size: row.get(6)?,
            with_uncertainty_recommendation: row.get(7)?,
            with_cluster_recommendation: row.get(8)?,
            uncertainty_recommendation_certainty_threshold: row.get(9)?,
            uncertainty_recommendation_ratio: row.get(10)?,
            cluster_recommendation_minimum_cluster_unity_size: row.get(11)?,
            cluster_recommendation_ratio_labeled_unlabeled: row.get(12)?,
            allow_recommendations_after_stop: row.get(13)?,
            stopping_criteria_uncertainty: row.get(14)?,
            stopping_criteria_acc: row.get(15)?,
            stopping_criteria_std: row.get(16)?,
            metrics_per_al_cycle: row.get(17)?,
            amount_of_user_asked_queries: row.get::<_, i64>(18)? as usize,
            acc_test: row.get(19)?,
            fit_score: row.get(20)?,
            roc_auc: row.get(21)?,
            param_list_id: row.get(22)?,
        })
    }

    /// Parse the per-iteration blob back into its typed form
    pub fn metrics(&self) -> Result<CycleMetrics> {
        Ok(serde_json::from_str(&self.metrics_per_al_cycle)?)
    }
}

/// One row of the grouped ranking: aggregate statistics over every run of a
/// hyperparameter set, plus one representative run for the parameter values
#[derive(Clone, Debug)]
pub struct GroupedRanking {
    pub param_list_id: String,
    pub n_runs: usize,
    pub avg_fit_score: f64,
    pub std_fit_score: f64,
    pub avg_global_score_no_weak_acc: f64,
    pub std_global_score_no_weak_acc: f64,
    pub avg_asked_queries: f64,
    pub std_asked_queries: f64,
    pub representative: StoredRun,
}

/// SQLite-backed store with one row per (configuration, dataset) run
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Open or create a result database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self::open_existing(path)?;
        store.init_schema(RESULT_TABLE_BODY, CURRENT_VERSION)?;
        Ok(store)
    }

    /// Open an in-memory database with the current schema
    pub fn open_in_memory() -> Result<Self> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.apply_pragmas()?;
        store.init_schema(RESULT_TABLE_BODY, CURRENT_VERSION)?;
        Ok(store)
    }

    /// Open without touching the schema.
    ///
    /// The migration command uses this so the database is seen exactly as it
    /// is on disk.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self { conn: Connection::open(path)? };
        store.apply_pragmas()?;
        Ok(store)
    }

    /// Open or create a database with the pre-rework schema, where a single
    /// legacy score pair stands in for the eight derived columns. Exists to
    /// stage inputs for the migration.
    pub fn open_legacy<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self::open_existing(path)?;
        store.init_schema(LEGACY_TABLE_BODY, LEGACY_VERSION)?;
        Ok(store)
    }

    /// In-memory variant of [`ResultStore::open_legacy`]
    pub fn legacy_in_memory() -> Result<Self> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.apply_pragmas()?;
        store.init_schema(LEGACY_TABLE_BODY, LEGACY_VERSION)?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn init_schema(&self, table_body: &str, version: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS experimentresult ({table_body});
             CREATE INDEX IF NOT EXISTS idx_result_param_list ON experimentresult(param_list_id);
             CREATE INDEX IF NOT EXISTS idx_result_dataset ON experimentresult(dataset_name);
             CREATE TABLE IF NOT EXISTS schema_version (
                 version TEXT NOT NULL,
                 applied_at TEXT NOT NULL DEFAULT (datetime('now'))
             );"
        ))?;
        let stamped: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))?;
        if stamped == 0 {
            self.conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        }
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Insert one finished run.
    ///
    /// Threshold columns whose switch is off are stored as NULL, so the
    /// grouping hash and the table stay honest about which knobs were live.
    pub fn insert(&self, record: &ExperimentResult) -> Result<()> {
        let config = &record.config;
        let blob = serde_json::to_string(&record.metrics)?;
        let cm_train = serde_json::to_string(record.confusion_matrix_train.rows())?;
        let cm_test = serde_json::to_string(record.confusion_matrix_test.rows())?;
        let report_train = serde_json::to_string(&record.classification_report_train)?;
        let report_test = serde_json::to_string(&record.classification_report_test)?;
        let scores = &record.scores;
        self.conn.execute(
            "INSERT INTO experimentresult (
                 datasets_path, dataset_name, db_name_or_type, classifier, cores, test_fraction,
                 sampling, random_seed, cluster, nr_learning_iterations, nr_queries_per_iteration,
                 start_set_size, with_uncertainty_recommendation, with_cluster_recommendation,
                 with_snuba_lite, minimum_test_accuracy_before_recommendations,
                 uncertainty_recommendation_certainty_threshold, uncertainty_recommendation_ratio,
                 snuba_lite_minimum_heuristic_accuracy,
                 cluster_recommendation_minimum_cluster_unity_size,
                 cluster_recommendation_ratio_labeled_unlabeled, allow_recommendations_after_stop,
                 stopping_criteria_uncertainty, stopping_criteria_acc, stopping_criteria_std,
                 metrics_per_al_cycle, amount_of_user_asked_queries, experiment_run_date, fit_time,
                 confusion_matrix_train, confusion_matrix_test, classification_report_train,
                 classification_report_test, acc_train, acc_test, fit_score, roc_auc,
                 param_list_id, cv_fit_score_mean, cv_fit_score_std, thread_id, end_time,
                 global_score_no_weak_roc_auc, global_score_no_weak_acc,
                 global_score_with_weak_roc_auc, global_score_with_weak_acc,
                 global_score_no_weak_roc_auc_norm, global_score_no_weak_acc_norm,
                 global_score_with_weak_roc_auc_norm, global_score_with_weak_acc_norm
             ) VALUES (
                 :datasets_path, :dataset_name, :db_name_or_type, :classifier, :cores,
                 :test_fraction, :sampling, :random_seed, :cluster, :nr_learning_iterations,
                 :nr_queries_per_iteration, :start_set_size, :with_uncertainty_recommendation,
                 :with_cluster_recommendation, :with_snuba_lite,
                 :minimum_test_accuracy_before_recommendations,
                 :uncertainty_recommendation_certainty_threshold, :uncertainty_recommendation_ratio,
                 :snuba_lite_minimum_heuristic_accuracy,
                 :cluster_recommendation_minimum_cluster_unity_size,
                 :cluster_recommendation_ratio_labeled_unlabeled, :allow_recommendations_after_stop,
                 :stopping_criteria_uncertainty, :stopping_criteria_acc, :stopping_criteria_std,
                 :metrics_per_al_cycle, :amount_of_user_asked_queries, :experiment_run_date,
                 :fit_time, :confusion_matrix_train, :confusion_matrix_test,
                 :classification_report_train, :classification_report_test, :acc_train, :acc_test,
                 :fit_score, :roc_auc, :param_list_id, :cv_fit_score_mean, :cv_fit_score_std,
                 :thread_id, :end_time, :global_score_no_weak_roc_auc, :global_score_no_weak_acc,
                 :global_score_with_weak_roc_auc, :global_score_with_weak_acc,
                 :global_score_no_weak_roc_auc_norm, :global_score_no_weak_acc_norm,
                 :global_score_with_weak_roc_auc_norm, :global_score_with_weak_acc_norm
             )",
            named_params! {
                ":datasets_path": config.datasets_path,
                ":dataset_name": record.dataset_name,
                ":db_name_or_type": config.db_name_or_type,
                ":classifier": config.classifier.to_string(),
                ":cores": config.cores as i64,
                ":test_fraction": config.test_fraction,
                ":sampling": config.sampling.to_string(),
                ":random_seed": config.random_seed as i64,
                ":cluster": config.cluster.to_string(),
                ":nr_learning_iterations": config.nr_learning_iterations as i64,
                ":nr_queries_per_iteration": config.nr_queries_per_iteration as i64,
                ":start_set_size": config.start_set_size,
                ":with_uncertainty_recommendation": config.with_uncertainty_recommendation,
                ":with_cluster_recommendation": config.with_cluster_recommendation,
                ":with_snuba_lite": config.with_snuba_lite,
                ":minimum_test_accuracy_before_recommendations":
                    config.minimum_test_accuracy_before_recommendations,
                ":uncertainty_recommendation_certainty_threshold":
                    config.with_uncertainty_recommendation
                        .then_some(config.uncertainty_recommendation_certainty_threshold),
                ":uncertainty_recommendation_ratio": config.with_uncertainty_recommendation
                    .then_some(config.uncertainty_recommendation_ratio),
                ":snuba_lite_minimum_heuristic_accuracy": config.with_snuba_lite
                    .then_some(config.snuba_lite_minimum_heuristic_accuracy),
                ":cluster_recommendation_minimum_cluster_unity_size":
                    config.with_cluster_recommendation
                        .then_some(config.cluster_recommendation_minimum_cluster_unity_size),
                ":cluster_recommendation_ratio_labeled_unlabeled":
                    config.with_cluster_recommendation
                        .then_some(config.cluster_recommendation_ratio_labeled_unlabeled),
                ":allow_recommendations_after_stop": config.allow_recommendations_after_stop,
                ":stopping_criteria_uncertainty": config.stopping_criteria_uncertainty,
                ":stopping_criteria_acc": config.stopping_criteria_acc,
                ":stopping_criteria_std": config.stopping_criteria_std,
                ":metrics_per_al_cycle": blob,
                ":amount_of_user_asked_queries": record.amount_of_user_asked_queries as i64,
                ":experiment_run_date": record.experiment_run_date.to_rfc3339(),
                ":fit_time": format!("{:?}", record.fit_time),
                ":confusion_matrix_train": cm_train,
                ":confusion_matrix_test": cm_test,
                ":classification_report_train": report_train,
                ":classification_report_test": report_test,
                ":acc_train": record.acc_train,
                ":acc_test": record.acc_test,
                ":fit_score": record.fit_score,
                ":roc_auc": record.roc_auc,
                ":param_list_id": record.param_list_id,
                ":cv_fit_score_mean": record.cv_fit_score_mean,
                ":cv_fit_score_std": record.cv_fit_score_std,
                ":thread_id": record.thread_id as i64,
                ":end_time": record.end_time.to_rfc3339(),
                ":global_score_no_weak_roc_auc": scores.global_score_no_weak_roc_auc,
                ":global_score_no_weak_acc": scores.global_score_no_weak_acc,
                ":global_score_with_weak_roc_auc": scores.global_score_with_weak_roc_auc,
                ":global_score_with_weak_acc": scores.global_score_with_weak_acc,
                ":global_score_no_weak_roc_auc_norm": scores.global_score_no_weak_roc_auc_norm,
                ":global_score_no_weak_acc_norm": scores.global_score_no_weak_acc_norm,
                ":global_score_with_weak_roc_auc_norm": scores.global_score_with_weak_roc_auc_norm,
                ":global_score_with_weak_acc_norm": scores.global_score_with_weak_acc_norm,
            },
        )?;
        Ok(())
    }

    /// Insert a row shaped like the pre-rework schema.
    ///
    /// Only useful for staging migration inputs; live code paths go through
    /// [`ResultStore::insert`].
    pub fn insert_legacy(
        &self,
        record: &ExperimentResult,
        global_score: f64,
        global_score_norm: f64,
    ) -> Result<()> {
        let config = &record.config;
        let blob = serde_json::to_string(&record.metrics)?;
        let cm_train = serde_json::to_string(record.confusion_matrix_train.rows())?;
        let cm_test = serde_json::to_string(record.confusion_matrix_test.rows())?;
        let report_train = serde_json::to_string(&record.classification_report_train)?;
        let report_test = serde_json::to_string(&record.classification_report_test)?;
        self.conn.execute(
            "INSERT INTO experimentresult (
                 datasets_path, dataset_name, db_name_or_type, classifier, cores, test_fraction,
                 sampling, random_seed, cluster, nr_learning_iterations, nr_queries_per_iteration,
                 start_set_size, with_uncertainty_recommendation, with_cluster_recommendation,
                 with_snuba_lite, minimum_test_accuracy_before_recommendations,
                 uncertainty_recommendation_certainty_threshold, uncertainty_recommendation_ratio,
                 snuba_lite_minimum_heuristic_accuracy,
                 cluster_recommendation_minimum_cluster_unity_size,
                 cluster_recommendation_ratio_labeled_unlabeled, allow_recommendations_after_stop,
                 stopping_criteria_uncertainty, stopping_criteria_acc, stopping_criteria_std,
                 metrics_per_al_cycle, amount_of_user_asked_queries, experiment_run_date, fit_time,
                 confusion_matrix_train, confusion_matrix_test, classification_report_train,
                 classification_report_test, acc_train, acc_test, fit_score, roc_auc,
                 param_list_id, cv_fit_score_mean, cv_fit_score_std, thread_id, end_time,
                 global_score, global_score_norm
             ) VALUES (
                 :datasets_path, :dataset_name, :db_name_or_type, :classifier, :cores,
                 :test_fraction, :sampling, :random_seed, :cluster, :nr_learning_iterations,
                 :nr_queries_per_iteration, :start_set_size, :with_uncertainty_recommendation,
                 :with_cluster_recommendation, :with_snuba_lite,
                 :minimum_test_accuracy_before_recommendations,
                 :uncertainty_recommendation_certainty_threshold, :uncertainty_recommendation_ratio,
                 :snuba_lite_minimum_heuristic_accuracy,
                 :cluster_recommendation_minimum_cluster_unity_size,
                 :cluster_recommendation_ratio_labeled_unlabeled, :allow_recommendations_after_stop,
                 :stopping_criteria_uncertainty, :stopping_criteria_acc, :stopping_criteria_std,
                 :metrics_per_al_cycle, :amount_of_user_asked_queries, :experiment_run_date,
                 :fit_time, :confusion_matrix_train, :confusion_matrix_test,
                 :classification_report_train, :classification_report_test, :acc_train, :acc_test,
                 :fit_score, :roc_auc, :param_list_id, :cv_fit_score_mean, :cv_fit_score_std,
                 :thread_id, :end_time, :global_score, :global_score_norm
             )",
            named_params! {
                ":datasets_path": config.datasets_path,
                ":dataset_name": record.dataset_name,
                ":db_name_or_type": config.db_name_or_type,
                ":classifier": config.classifier.to_string(),
                ":cores": config.cores as i64,
                ":test_fraction": config.test_fraction,
                ":sampling": config.sampling.to_string(),
                ":random_seed": config.random_seed as i64,
                ":cluster": config.cluster.to_string(),
                ":nr_learning_iterations": config.nr_learning_iterations as i64,
                ":nr_queries_per_iteration": config.nr_queries_per_iteration as i64,
                ":start_set_size": config.start_set_size,
                ":with_uncertainty_recommendation": config.with_uncertainty_recommendation,
                ":with_cluster_recommendation": config.with_cluster_recommendation,
                ":with_snuba_lite": config.with_snuba_lite,
                ":minimum_test_accuracy_before_recommendations":
                    config.minimum_test_accuracy_before_recommendations,
                ":uncertainty_recommendation_certainty_threshold":
                    config.with_uncertainty_recommendation
                        .then_some(config.uncertainty_recommendation_certainty_threshold),
                ":uncertainty_recommendation_ratio": config.with_uncertainty_recommendation
                    .then_some(config.uncertainty_recommendation_ratio),
                ":snuba_lite_minimum_heuristic_accuracy": config.with_snuba_lite
                    .then_some(config.snuba_lite_minimum_heuristic_accuracy),
                ":cluster_recommendation_minimum_cluster_unity_size":
                    config.with_cluster_recommendation
                        .then_some(config.cluster_recommendation_minimum_cluster_unity_size),
                ":cluster_recommendation_ratio_labeled_unlabeled":
                    config.with_cluster_recommendation
                        .then_some(config.cluster_recommendation_ratio_labeled_unlabeled),
                ":allow_recommendations_after_stop": config.allow_recommendations_after_stop,
                ":stopping_criteria_uncertainty": config.stopping_criteria_uncertainty,
                ":stopping_criteria_acc": config.stopping_criteria_acc,
                ":stopping_criteria_std": config.stopping_criteria_std,
                ":metrics_per_al_cycle": blob,
                ":amount_of_user_asked_queries": record.amount_of_user_asked_queries as i64,
                ":experiment_run_date": record.experiment_run_date.to_rfc3339(),
                ":fit_time": format!("{:?}", record.fit_time),
                ":confusion_matrix_train": cm_train,
                ":confusion_matrix_test": cm_test,
                ":classification_report_train": report_train,
                ":classification_report_test": report_test,
                ":acc_train": record.acc_train,
                ":acc_test": record.acc_test,
                ":fit_score": record.fit_score,
                ":roc_auc": record.roc_auc,
                ":param_list_id": record.param_list_id,
                ":cv_fit_score_mean": record.cv_fit_score_mean,
                ":cv_fit_score_std": record.cv_fit_score_std,
                ":thread_id": record.thread_id as i64,
                ":end_time": record.end_time.to_rfc3339(),
                ":global_score": global_score,
                ":global_score_norm": global_score_norm,
            },
        )?;
        Ok(())
    }

    /// Row counts per dataset, sorted by dataset name
    pub fn count_by_dataset(&self) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT dataset_name, COUNT(id) FROM experimentresult
             GROUP BY dataset_name ORDER BY dataset_name",
        )?;
        let rows =
            stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        let mut counts = Vec::new();
        for row in rows {
            let (name, count) = row?;
            counts.push((name, count as usize));
        }
        Ok(counts)
    }

    /// Grouped ranking over every run within the oracle budget.
    ///
    /// Runs are grouped by `param_list_id`; groups are ordered by run count
    /// first so that configurations with more evidence rank ahead of lucky
    /// single runs, then by the averaged metric, both descending.
    pub fn ranking(
        &self,
        budget: usize,
        metric: RankingMetric,
        limit: usize,
    ) -> Result<Vec<GroupedRanking>> {
        let sql = format!(
            "SELECT param_list_id, COUNT(id),
                    AVG(fit_score), AVG(fit_score * fit_score),
                    AVG(global_score_no_weak_acc),
                    AVG(global_score_no_weak_acc * global_score_no_weak_acc),
                    AVG(amount_of_user_asked_queries),
                    AVG(amount_of_user_asked_queries * amount_of_user_asked_queries)
             FROM experimentresult
             WHERE amount_of_user_asked_queries < ?1
             GROUP BY param_list_id
             ORDER BY COUNT(id) DESC, AVG({metric}) DESC
             LIMIT ?2",
            metric = metric.column(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![budget as i64, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, f64>(7)?,
            ))
        })?;
        let mut groups = Vec::new();
        for row in rows {
            let (id, n_runs, avg_fit, avg_fit_sq, avg_nw, avg_nw_sq, avg_asked, avg_asked_sq) =
                row?;
            let representative = self.representative(&id)?;
            groups.push(GroupedRanking {
                param_list_id: id,
                n_runs: n_runs as usize,
                avg_fit_score: avg_fit,
                std_fit_score: spread(avg_fit, avg_fit_sq),
                avg_global_score_no_weak_acc: avg_nw,
                std_global_score_no_weak_acc: spread(avg_nw, avg_nw_sq),
                avg_asked_queries: avg_asked,
                std_asked_queries: spread(avg_asked, avg_asked_sq),
                representative,
            });
        }
        Ok(groups)
    }

    /// Single runs ordered by fit score, best first
    pub fn top_by_fit_score(&self, limit: usize) -> Result<Vec<StoredRun>> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM experimentresult ORDER BY fit_score DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], StoredRun::from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    /// Every run of one hyperparameter set on one dataset, in insert order
    pub fn runs_for(&self, param_list_id: &str, dataset_name: &str) -> Result<Vec<StoredRun>> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM experimentresult
             WHERE param_list_id = ?1 AND dataset_name = ?2 ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![param_list_id, dataset_name], StoredRun::from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    fn representative(&self, param_list_id: &str) -> Result<StoredRun> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM experimentresult
             WHERE param_list_id = ?1 ORDER BY id LIMIT 1"
        );
        Ok(self.conn.query_row(&sql, [param_list_id], StoredRun::from_row)?)
    }
}

/// Population standard deviation recovered from the first two moments
fn spread(mean: f64, mean_sq: f64) -> f64 {
    (mean_sq - mean * mean).max(0.0).sqrt()
}
