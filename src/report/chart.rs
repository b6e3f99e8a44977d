//! Vega-Lite export of per-run cycle progress
//!
//! One chart row per stored run, two panels per row (ROC-AUC and test
//! accuracy). Each panel draws one rect per cycle iteration: the x span is
//! the labeled-point interval that iteration added (running sum of
//! `query_length`), the height is the metric value, the color is the label
//! source. The document embeds its data, so the file stands alone.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::cycle::CycleMetrics;
use crate::store::StoredRun;

use super::{ReportError, Result};

/// Build the chart document for the runs of one configuration on one dataset.
pub fn chart_document(runs: &[StoredRun]) -> Result<Value> {
    if runs.is_empty() {
        return Err(ReportError::NoRuns);
    }

    let mut rows = Vec::with_capacity(runs.len());
    for run in runs {
        let metrics = run.metrics()?;
        if !metrics.is_consistent() {
            return Err(ReportError::MalformedMetrics(run.id));
        }
        let roc = panel(run, &metrics, "ROC-AUC", &metrics.all_unlabeled_roc_auc_scores);
        let acc = panel(run, &metrics, "test accuracy", &metrics.test_accuracies());
        rows.push(json!({ "hconcat": [roc, acc] }));
    }

    Ok(json!({
        "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
        "vconcat": rows,
    }))
}

/// Build the document and write it to `destination` as pretty JSON.
pub fn write_chart(runs: &[StoredRun], destination: &Path) -> Result<()> {
    let document = chart_document(runs)?;
    fs::write(destination, serde_json::to_string_pretty(&document)?)?;
    Ok(())
}

fn panel(run: &StoredRun, metrics: &CycleMetrics, title: &str, series: &[f64]) -> Value {
    let mut values = Vec::with_capacity(series.len());
    let mut labeled = 0usize;
    for (iteration, value) in series.iter().enumerate() {
        let start = labeled;
        labeled += metrics.query_length[iteration];
        values.push(json!({
            "iteration": iteration,
            "start": start,
            "end": labeled,
            "value": value,
            "source": metrics.recommendation[iteration].display_name(),
        }));
    }

    json!({
        "title": format!("run {} on {}", run.id, run.dataset_name),
        "width": 360,
        "height": 140,
        "data": { "values": values },
        "mark": "rect",
        "encoding": {
            "x": { "field": "start", "type": "quantitative", "title": "labeled points" },
            "x2": { "field": "end" },
            "y": {
                "field": "value",
                "type": "quantitative",
                "title": title,
                "scale": { "domain": [0.0, 1.0] }
            },
            "y2": { "datum": 0 },
            "color": {
                "field": "source",
                "type": "nominal",
                "title": "label source",
                "scale": { "scheme": "tableau10" }
            },
            "tooltip": [
                { "field": "iteration", "type": "quantitative" },
                { "field": "value", "type": "quantitative", "format": ".4f" },
                { "field": "source", "type": "nominal" },
                { "field": "end", "type": "quantitative", "title": "labeled points" }
            ]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LabelSource;
    use crate::metrics::ClassificationReport;

    fn report(accuracy_pairs: (&[usize], &[usize])) -> ClassificationReport {
        ClassificationReport::from_predictions(accuracy_pairs.0, accuracy_pairs.1, 2)
            .expect("report")
    }

    fn run_with_metrics() -> StoredRun {
        let mut metrics = CycleMetrics::new();
        metrics.push(LabelSource::GroundTruth, 4, 1.0, 0.5, report((&[0, 1], &[0, 1])));
        metrics.push(LabelSource::Oracle, 10, 1.0, 0.8, report((&[0, 1], &[0, 1])));
        metrics.push(LabelSource::WeakCertainty, 3, 0.9, 0.85, report((&[0, 1, 1], &[0, 1, 0])));

        StoredRun {
            id: 7,
            dataset_name: "dwtc".to_string(),
            classifier: "naive_bayes".to_string(),
            sampling: "uncertainty_lc".to_string(),
            cluster: "dummy".to_string(),
            nr_queries_per_iteration: 10,
            start_set_size: 0.01,
            with_uncertainty_recommendation: true,
            with_cluster_recommendation: false,
            uncertainty_recommendation_certainty_threshold: Some(0.9),
            uncertainty_recommendation_ratio: Some(0.01),
            cluster_recommendation_minimum_cluster_unity_size: None,
            cluster_recommendation_ratio_labeled_unlabeled: None,
            allow_recommendations_after_stop: false,
            stopping_criteria_uncertainty: 0.0,
            stopping_criteria_acc: 0.0,
            stopping_criteria_std: 0.0,
            metrics_per_al_cycle: serde_json::to_string(&metrics).expect("blob"),
            amount_of_user_asked_queries: 10,
            acc_test: 0.9,
            fit_score: 0.8,
            roc_auc: 0.85,
            param_list_id: "p1".to_string(),
        }
    }

    #[test]
    fn test_document_embeds_runs_and_panels() {
        let document = chart_document(&[run_with_metrics()]).unwrap();
        assert_eq!(document["$schema"], "https://vega.github.io/schema/vega-lite/v5.json");
        let rows = document["vconcat"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        let panels = rows[0]["hconcat"].as_array().unwrap();
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0]["encoding"]["y"]["title"], "ROC-AUC");
        assert_eq!(panels[1]["encoding"]["y"]["title"], "test accuracy");
    }

    #[test]
    fn test_rects_span_cumulative_labeled_points() {
        let document = chart_document(&[run_with_metrics()]).unwrap();
        let values = document["vconcat"][0]["hconcat"][0]["data"]["values"].as_array().unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0]["start"], 0);
        assert_eq!(values[0]["end"], 4);
        assert_eq!(values[1]["start"], 4);
        assert_eq!(values[1]["end"], 14);
        assert_eq!(values[2]["end"], 17);
        assert_eq!(values[0]["source"], "Ground Truth");
        assert_eq!(values[1]["source"], "Oracle");
        assert_eq!(values[2]["source"], "Weak Certainty");
    }

    #[test]
    fn test_y_domain_and_color_scheme() {
        let document = chart_document(&[run_with_metrics()]).unwrap();
        let encoding = &document["vconcat"][0]["hconcat"][0]["encoding"];
        assert_eq!(encoding["y"]["scale"]["domain"][1], 1.0);
        assert_eq!(encoding["color"]["scale"]["scheme"], "tableau10");
    }

    #[test]
    fn test_no_runs_is_an_error() {
        assert!(matches!(chart_document(&[]), Err(ReportError::NoRuns)));
    }

    #[test]
    fn test_malformed_blob_is_an_error() {
        let mut run = run_with_metrics();
        run.metrics_per_al_cycle = "not json".to_string();
        assert!(chart_document(&[run]).is_err());
    }

    #[test]
    fn test_write_chart_is_standalone_json() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("chart.json");
        write_chart(&[run_with_metrics()], &destination).unwrap();
        let written = std::fs::read_to_string(&destination).unwrap();
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert!(parsed["vconcat"].is_array());
    }
}
