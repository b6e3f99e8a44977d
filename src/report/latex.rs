//! Transposed LaTeX rendering of the grouped ranking
//!
//! One `Top i` column per group so the fragment stays narrow no matter how
//! many parameters a row carries. The output is a booktabs `tabularx` body
//! meant for `\input` into a surrounding document.

use std::fs;
use std::path::Path;

use crate::store::GroupedRanking;

use super::{ReportError, Result};

/// Render the ranking as a `tabularx` fragment. Score and threshold cells
/// become percentages with two decimals.
pub fn latex_ranking(groups: &[GroupedRanking]) -> Result<String> {
    if groups.is_empty() {
        return Err(ReportError::NoRuns);
    }

    let rows: Vec<(&str, Vec<String>)> = vec![
        ("runs", groups.iter().map(|group| group.n_runs.to_string()).collect()),
        (
            "fit score",
            groups
                .iter()
                .map(|group| plus_minus(group.avg_fit_score, group.std_fit_score))
                .collect(),
        ),
        (
            "global score (no weak, acc)",
            groups
                .iter()
                .map(|group| {
                    plus_minus(group.avg_global_score_no_weak_acc, group.std_global_score_no_weak_acc)
                })
                .collect(),
        ),
        (
            "asked queries",
            groups
                .iter()
                .map(|group| format!("{:.1} $\\pm$ {:.1}", group.avg_asked_queries, group.std_asked_queries))
                .collect(),
        ),
        (
            "sampling",
            groups.iter().map(|group| escape(&group.representative.sampling)).collect(),
        ),
        (
            "cluster",
            groups.iter().map(|group| escape(&group.representative.cluster)).collect(),
        ),
        (
            "queries per iteration",
            groups
                .iter()
                .map(|group| group.representative.nr_queries_per_iteration.to_string())
                .collect(),
        ),
        (
            "uncertainty recommendation",
            groups
                .iter()
                .map(|group| {
                    let run = &group.representative;
                    switch_cell(
                        run.with_uncertainty_recommendation,
                        run.uncertainty_recommendation_certainty_threshold,
                        run.uncertainty_recommendation_ratio,
                    )
                })
                .collect(),
        ),
        (
            "cluster recommendation",
            groups
                .iter()
                .map(|group| {
                    let run = &group.representative;
                    switch_cell(
                        run.with_cluster_recommendation,
                        run.cluster_recommendation_minimum_cluster_unity_size,
                        run.cluster_recommendation_ratio_labeled_unlabeled,
                    )
                })
                .collect(),
        ),
    ];

    let mut out = String::new();
    out.push_str(&format!(
        "\\begin{{tabularx}}{{\\linewidth}}{{l{}}}\n",
        "X".repeat(groups.len())
    ));
    out.push_str("\\toprule\n");
    let headers: Vec<String> = (1..=groups.len()).map(|i| format!("Top {i}")).collect();
    out.push_str(&format!(" & {} \\\\\n", headers.join(" & ")));
    out.push_str("\\midrule\n");
    for (label, cells) in rows {
        out.push_str(&format!("{label} & {} \\\\\n", cells.join(" & ")));
    }
    out.push_str("\\bottomrule\n");
    out.push_str("\\end{tabularx}\n");
    Ok(out)
}

/// Render and write the fragment to `destination`.
pub fn write_latex_ranking(groups: &[GroupedRanking], destination: &Path) -> Result<()> {
    let fragment = latex_ranking(groups)?;
    fs::write(destination, fragment)?;
    Ok(())
}

fn percent(value: f64) -> String {
    format!("{:.2}\\%", value * 100.0)
}

fn plus_minus(mean: f64, std: f64) -> String {
    format!("{} $\\pm$ {}", percent(mean), percent(std))
}

fn switch_cell(enabled: bool, primary: Option<f64>, secondary: Option<f64>) -> String {
    match (enabled, primary, secondary) {
        (true, Some(primary), Some(secondary)) => {
            format!("{} / {}", percent(primary), percent(secondary))
        }
        (true, _, _) => "on".to_string(),
        (false, _, _) => "off".to_string(),
    }
}

/// Escape the characters LaTeX treats specially in the stored names.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '_' | '%' | '&' | '#' | '$' => {
                escaped.push('\\');
                escaped.push(c);
            }
            other => escaped.push(other),
        }
    }
    escaped
}
