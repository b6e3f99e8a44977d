//! Gaussian naive Bayes

use ndarray::{Array2, ArrayView2};

use super::{argmax, Classifier, ModelError, Result};

/// Gaussian naive Bayes classifier
///
/// Per-class feature means and variances with log-space priors. Variances are
/// smoothed by `var_smoothing` times the largest per-feature variance of the
/// training data so near-constant features stay numerically stable.
#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    n_classes: usize,
    var_smoothing: f64,
    /// Per-class log prior; `None` while unfitted, NEG_INFINITY for empty classes
    log_priors: Option<Vec<f64>>,
    /// means[class][feature], only meaningful where the class has samples
    means: Option<Vec<Vec<f64>>>,
    variances: Option<Vec<Vec<f64>>>,
    n_features: usize,
}

impl GaussianNaiveBayes {
    /// Create an untrained model covering `n_classes` probability columns
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            var_smoothing: 1e-9,
            log_priors: None,
            means: None,
            variances: None,
            n_features: 0,
        }
    }

    /// Override the variance smoothing factor
    pub fn with_var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if y.len() != n_samples {
            return Err(ModelError::SampleCountMismatch(n_samples, y.len()));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= self.n_classes) {
            return Err(ModelError::LabelOutOfRange(bad, self.n_classes));
        }

        // Smoothing floor from the pooled per-feature variance
        let mut max_var = 0.0_f64;
        for feature in 0..n_features {
            let col = x.column(feature);
            let mean = col.sum() / n_samples as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_samples as f64;
            max_var = max_var.max(var);
        }
        let epsilon = if max_var > 0.0 { self.var_smoothing * max_var } else { self.var_smoothing };

        let mut log_priors = vec![f64::NEG_INFINITY; self.n_classes];
        let mut means = vec![vec![0.0; n_features]; self.n_classes];
        let mut variances = vec![vec![0.0; n_features]; self.n_classes];

        for class in 0..self.n_classes {
            let members: Vec<usize> =
                y.iter().enumerate().filter(|(_, &label)| label == class).map(|(i, _)| i).collect();
            if members.is_empty() {
                continue;
            }
            let count = members.len() as f64;
            log_priors[class] = (count / n_samples as f64).ln();

            for feature in 0..n_features {
                let sum: f64 = members.iter().map(|&i| x[[i, feature]]).sum();
                let mean = sum / count;
                let sum_sq: f64 = members.iter().map(|&i| (x[[i, feature]] - mean).powi(2)).sum();
                means[class][feature] = mean;
                variances[class][feature] = sum_sq / count + epsilon;
            }
        }

        self.log_priors = Some(log_priors);
        self.means = Some(means);
        self.variances = Some(variances);
        self.n_features = n_features;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row.iter().copied())).collect())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let log_priors = self.log_priors.as_ref().ok_or(ModelError::NotFitted)?;
        let means = self.means.as_ref().ok_or(ModelError::NotFitted)?;
        let variances = self.variances.as_ref().ok_or(ModelError::NotFitted)?;

        let (n_samples, n_features) = x.dim();
        if n_features != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                found: n_features,
            });
        }

        let mut proba = Array2::zeros((n_samples, self.n_classes));
        for sample in 0..n_samples {
            let mut log_probs = vec![f64::NEG_INFINITY; self.n_classes];
            for class in 0..self.n_classes {
                if log_priors[class] == f64::NEG_INFINITY {
                    continue;
                }
                let mut lp = log_priors[class];
                for feature in 0..n_features {
                    let diff = x[[sample, feature]] - means[class][feature];
                    let var = variances[class][feature];
                    lp += -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                        - diff * diff / (2.0 * var);
                }
                log_probs[class] = lp;
            }

            // log-sum-exp normalization; classes without samples stay at zero
            let max_lp = log_probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut total = 0.0;
            let mut exps = vec![0.0; self.n_classes];
            for class in 0..self.n_classes {
                if log_probs[class] > f64::NEG_INFINITY {
                    let e = (log_probs[class] - max_lp).exp();
                    exps[class] = e;
                    total += e;
                }
            }
            for class in 0..self.n_classes {
                proba[[sample, class]] = if total > 0.0 { exps[class] / total } else { 0.0 };
            }
        }

        Ok(proba)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [5.0, 5.1],
            [5.1, 5.0],
            [4.9, 5.2],
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_fit_predict_separable() {
        let (x, y) = separable();
        let mut model = GaussianNaiveBayes::new(2);
        model.fit(x.view(), &y).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let (x, y) = separable();
        let mut model = GaussianNaiveBayes::new(2);
        model.fit(x.view(), &y).unwrap();
        let proba = model.predict_proba(x.view()).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_class_gets_zero_column() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [5.0, 5.0], [5.1, 5.1]];
        let y = vec![0, 0, 1, 1];
        let mut model = GaussianNaiveBayes::new(3);
        model.fit(x.view(), &y).unwrap();
        let proba = model.predict_proba(x.view()).unwrap();
        for sample in 0..4 {
            assert_eq!(proba[[sample, 2]], 0.0);
        }
    }

    #[test]
    fn test_unfitted_rejected() {
        let model = GaussianNaiveBayes::new(2);
        let x = array![[0.0, 0.0]];
        assert!(matches!(model.predict(x.view()), Err(ModelError::NotFitted)));
    }

    #[test]
    fn test_empty_training_set_rejected() {
        let mut model = GaussianNaiveBayes::new(2);
        let x = Array2::<f64>::zeros((0, 2));
        assert!(matches!(model.fit(x.view(), &[]), Err(ModelError::EmptyTrainingSet)));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let (x, y) = separable();
        let mut model = GaussianNaiveBayes::new(2);
        model.fit(x.view(), &y).unwrap();
        let bad = array![[1.0, 2.0, 3.0]];
        assert!(model.predict(bad.view()).is_err());
    }

    #[test]
    fn test_label_out_of_range_rejected() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let mut model = GaussianNaiveBayes::new(2);
        assert!(matches!(
            model.fit(x.view(), &[0, 5]),
            Err(ModelError::LabelOutOfRange(5, 2))
        ));
    }

    #[test]
    fn test_constant_feature_survives() {
        let x = array![[1.0, 0.0], [1.0, 0.1], [1.0, 5.0], [1.0, 5.1]];
        let y = vec![0, 0, 1, 1];
        let mut model = GaussianNaiveBayes::new(2);
        model.fit(x.view(), &y).unwrap();
        let preds = model.predict(x.view()).unwrap();
        assert_eq!(preds, y);
    }
}
