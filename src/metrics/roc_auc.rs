//! One-vs-rest ROC-AUC

use ndarray::ArrayView2;

use super::{MetricsError, Result};

/// Macro-averaged one-vs-rest ROC-AUC from class probabilities.
///
/// Per class, the AUC is the Mann-Whitney rank statistic of the class's
/// probability column: the chance a random positive outranks a random
/// negative, with ties counted half. Classes with no positive or no negative
/// examples are skipped; if every class is skipped the score is undefined.
pub fn roc_auc_score(proba: ArrayView2<'_, f64>, y_true: &[usize]) -> Result<f64> {
    if y_true.is_empty() {
        return Err(MetricsError::EmptyInput);
    }
    if proba.nrows() != y_true.len() {
        return Err(MetricsError::LengthMismatch(proba.nrows(), y_true.len()));
    }

    let n_classes = proba.ncols();
    let mut aucs = Vec::new();

    for class in 0..n_classes {
        let n_pos = y_true.iter().filter(|&&y| y == class).count();
        let n_neg = y_true.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            continue;
        }

        let scores: Vec<f64> = (0..y_true.len()).map(|i| proba[[i, class]]).collect();
        aucs.push(rank_auc(&scores, y_true, class, n_pos, n_neg));
    }

    if aucs.is_empty() {
        return Err(MetricsError::SingleClass);
    }
    Ok(aucs.iter().sum::<f64>() / aucs.len() as f64)
}

fn rank_auc(scores: &[f64], y_true: &[usize], class: usize, n_pos: usize, n_neg: usize) -> f64 {
    let n = scores.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a].partial_cmp(&scores[b]).unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks across tied scores, 1-based
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg_rank;
        }
        i = j;
    }

    let rank_sum: f64 =
        (0..n).filter(|&i| y_true[i] == class).map(|i| ranks[i]).sum();
    let u = rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos as f64 * n_neg as f64)
}
