//! Read-only reporting over stored results
//!
//! Everything here consumes rows the store hands back; nothing writes to the
//! database.
//!
//! # Architecture
//!
//! - `ranking`: the `count` and `table` text reports
//! - `latex`: the ranking transposed into a booktabs `tabularx` fragment
//! - `chart`: self-contained Vega-Lite progress charts
//! - `stats`: top runs with their weak-label iteration counts
//!
//! # Example
//!
//! ```ignore
//! use indagar::report::ranking_table;
//! use indagar::store::{RankingMetric, ResultStore};
//!
//! let store = ResultStore::open("results.db")?;
//! let groups = store.ranking(2000, RankingMetric::FitScore, 5)?;
//! println!("{}", ranking_table(&groups));
//! ```

mod chart;
mod latex;
mod ranking;
mod stats;

pub use chart::{chart_document, write_chart};
pub use latex::{latex_ranking, write_latex_ranking};
pub use ranking::{count_lines, ranking_table};
pub use stats::stats_table;

use thiserror::Error;

use crate::store::StoreError;

/// Reporting errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No stored runs match the request")]
    NoRuns,

    #[error("Run {0} holds an inconsistent metric log")]
    MalformedMetrics(i64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for reporting operations
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ReportError::NoRuns.to_string(), "No stored runs match the request");
        assert_eq!(
            ReportError::MalformedMetrics(12).to_string(),
            "Run 12 holds an inconsistent metric log"
        );
    }
}
