//! SQLite persistence for experiment outcomes
//!
//! One row per (configuration, dataset) run, kept in a single
//! `experimentresult` table under WAL journaling. Rows carry the full
//! hyperparameter set next to the outcome so the reporting queries can group
//! repeated runs of one configuration by its `param_list_id` hash.
//!
//! # Architecture
//!
//! - `record`: the row type assembled from a finished cycle
//! - `sqlite`: connection handling, schema, inserts, ranking queries
//! - `migrate`: one-shot backfill of the derived global-score columns
//!
//! # Example
//!
//! ```ignore
//! use indagar::store::{RankingMetric, ResultStore};
//!
//! let store = ResultStore::open("experiment_results.db")?;
//! store.insert(&record)?;
//! let ranked = store.ranking(2000, RankingMetric::FitScore, 10)?;
//! ```

mod migrate;
mod record;
mod sqlite;

pub use migrate::migrate_global_scores;
pub use record::ExperimentResult;
pub use sqlite::{GroupedRanking, RankingMetric, ResultStore, StoredRun};

use thiserror::Error;

/// Errors raised by the result store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Blob column holds invalid JSON: {0}")]
    Blob(#[from] serde_json::Error),

    #[error("Unknown ranking metric: {0}")]
    UnknownMetric(String),

    #[error("Migration already applied: column {0} exists")]
    AlreadyMigrated(String),

    #[error("Legacy column {0} is missing; nothing to migrate")]
    MissingLegacyColumn(String),

    #[error("Stored metrics cannot be rescored: {0}")]
    Rescore(#[from] crate::cycle::CycleError),
}

/// Convenience alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UnknownMetric("roc_auc".to_string());
        assert_eq!(err.to_string(), "Unknown ranking metric: roc_auc");
        let err = StoreError::AlreadyMigrated("global_score_no_weak_acc".to_string());
        assert!(err.to_string().contains("already applied"));
        let err = StoreError::MissingLegacyColumn("global_score".to_string());
        assert!(err.to_string().contains("nothing to migrate"));
    }
}
