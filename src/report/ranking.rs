//! Text renderings of the stored results

use crate::store::GroupedRanking;

/// The `count` report: one row count per dataset, counts right-aligned.
pub fn count_lines(counts: &[(String, usize)]) -> String {
    let width = counts.iter().map(|(_, count)| count.to_string().len()).max().unwrap_or(1);
    counts
        .iter()
        .map(|(name, count)| format!("{count:>width$}  {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `table` report: one row per configuration group, ranking order.
pub fn ranking_table(groups: &[GroupedRanking]) -> String {
    let header = [
        "top",
        "runs",
        "fit score",
        "no-weak acc",
        "asked",
        "sampling",
        "cluster",
        "queries",
        "uncertainty rec",
        "cluster rec",
    ];
    let rows: Vec<Vec<String>> =
        groups.iter().enumerate().map(|(index, group)| group_row(index + 1, group)).collect();
    render_table(&header, &rows)
}

fn group_row(top: usize, group: &GroupedRanking) -> Vec<String> {
    let run = &group.representative;
    vec![
        top.to_string(),
        group.n_runs.to_string(),
        format!("{:.4}±{:.4}", group.avg_fit_score, group.std_fit_score),
        format!(
            "{:.4}±{:.4}",
            group.avg_global_score_no_weak_acc, group.std_global_score_no_weak_acc
        ),
        format!("{:.1}±{:.1}", group.avg_asked_queries, group.std_asked_queries),
        run.sampling.clone(),
        run.cluster.clone(),
        run.nr_queries_per_iteration.to_string(),
        uncertainty_cell(
            run.with_uncertainty_recommendation,
            run.uncertainty_recommendation_certainty_threshold,
            run.uncertainty_recommendation_ratio,
        ),
        cluster_cell(
            run.with_cluster_recommendation,
            run.cluster_recommendation_minimum_cluster_unity_size,
            run.cluster_recommendation_ratio_labeled_unlabeled,
        ),
    ]
}

/// Certainty threshold / ratio when the switch is on, `off` otherwise.
fn uncertainty_cell(enabled: bool, threshold: Option<f64>, ratio: Option<f64>) -> String {
    match (enabled, threshold, ratio) {
        (true, Some(threshold), Some(ratio)) => format!("{threshold:.2}/{ratio:.4}"),
        (true, _, _) => "on".to_string(),
        (false, _, _) => "off".to_string(),
    }
}

/// Unity size / labeled ratio when the switch is on, `off` otherwise.
fn cluster_cell(enabled: bool, unity: Option<f64>, labeled_ratio: Option<f64>) -> String {
    match (enabled, unity, labeled_ratio) {
        (true, Some(unity), Some(labeled_ratio)) => format!("{unity:.2}/{labeled_ratio:.2}"),
        (true, _, _) => "on".to_string(),
        (false, _, _) => "off".to_string(),
    }
}

/// Fixed-width rendering: columns padded to their widest cell, two spaces
/// between columns, trailing padding trimmed.
pub(crate) fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths.iter().copied())
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_cells: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let mut lines = vec![format_row(&header_cells)];
    for row in rows {
        lines.push(format_row(row));
    }
    lines.join("\n")
}
