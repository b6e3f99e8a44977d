//! Per-run stats summary

use crate::data::LabelSource;
use crate::store::StoredRun;

use super::ranking::render_table;
use super::Result;

/// The `stats` report: one line per run in the given order, with the
/// weak-label iteration counts pulled from each metric blob.
pub fn stats_table(runs: &[StoredRun]) -> Result<String> {
    let header =
        ["sampling", "cluster", "U", "C", "after stop", "asked", "acc test", "fit score"];
    let mut rows = Vec::with_capacity(runs.len());
    for run in runs {
        let metrics = run.metrics()?;
        rows.push(vec![
            run.sampling.clone(),
            run.cluster.clone(),
            metrics.count_source(LabelSource::WeakCertainty).to_string(),
            metrics.count_source(LabelSource::WeakCluster).to_string(),
            run.allow_recommendations_after_stop.to_string(),
            run.amount_of_user_asked_queries.to_string(),
            format!("{:.4}", run.acc_test),
            format!("{:.4}", run.fit_score),
        ]);
    }
    Ok(render_table(&header, &rows))
}
