//! Logistic regression over standardized session features
//!
//! Features are standardized with the training mean and standard deviation,
//! then a single logistic unit is fit with full-batch gradient descent on the
//! L2-regularized log loss. Training is deterministic for a given corpus order.

use serde::{Deserialize, Serialize};

use crate::corpus::LabeledCorpus;
use crate::error::{ArtifactError, ClassifyError};
use crate::features::{FeatureRow, Label, FEATURE_COLUMNS, FEATURE_COUNT};
use crate::model::{ClassDistribution, ClassifierArtifact};

/// Algorithm identifier reported by [`ClassifierArtifact::name`]
pub const ALGORITHM_NAME: &str = "logistic-regression";

/// Gradient descent settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on the weights (bias excluded)
    pub l2: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 2000,
            learning_rate: 0.5,
            l2: 1e-4,
        }
    }
}

/// Fitted parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Per-feature training mean
    pub means: FeatureRow,
    /// Per-feature training standard deviation (1.0 for constant features)
    pub scales: FeatureRow,
    /// Weights on standardized features
    pub weights: FeatureRow,
    pub bias: f64,
}

impl LogisticRegression {
    /// Fit on a corpus. Both classes must be present.
    pub fn fit(corpus: &LabeledCorpus, options: &TrainingOptions) -> Result<Self, ClassifyError> {
        for label in Label::ALL {
            if corpus.count_for(label) == 0 {
                return Err(ClassifyError::Training(format!(
                    "corpus has no {} sessions",
                    label.as_str()
                )));
            }
        }
        if options.epochs == 0
            || !(options.learning_rate.is_finite() && options.learning_rate > 0.0)
            || !(options.l2.is_finite() && options.l2 >= 0.0)
        {
            return Err(ClassifyError::Training(format!(
                "invalid training options: {options:?}"
            )));
        }

        let rows: Vec<FeatureRow> = corpus.records().iter().map(|r| r.features.to_row()).collect();
        let targets: Vec<f64> = corpus
            .records()
            .iter()
            .map(|r| if r.label == Label::Distracted { 1.0 } else { 0.0 })
            .collect();

        let (means, scales) = standardization(&rows);
        let standardized: Vec<FeatureRow> = rows
            .iter()
            .map(|row| standardize(row, &means, &scales))
            .collect();

        let n = rows.len() as f64;
        let mut weights = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;

        for _ in 0..options.epochs {
            let mut grad_w = [0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;

            for (z, y) in standardized.iter().zip(&targets) {
                let err = sigmoid(dot(&weights, z) + bias) - y;
                for (g, x) in grad_w.iter_mut().zip(z) {
                    *g += err * x;
                }
                grad_b += err;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= options.learning_rate * (g / n + options.l2 * *w);
            }
            bias -= options.learning_rate * grad_b / n;
        }

        let model = Self {
            means,
            scales,
            weights,
            bias,
        };
        model.check().map_err(ClassifyError::Training)?;
        log::debug!("Fitted logistic regression: {:?}", model);
        Ok(model)
    }

    /// Reject parameter sets that cannot produce meaningful probabilities
    pub fn check(&self) -> Result<(), String> {
        let finite = |values: &FeatureRow| values.iter().all(|v| v.is_finite());
        if !finite(&self.means) || !finite(&self.weights) || !self.bias.is_finite() {
            return Err("non-finite model parameters".to_string());
        }
        if let Some(idx) = self.scales.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(format!(
                "scale for {} must be positive and finite",
                FEATURE_COLUMNS[idx]
            ));
        }
        Ok(())
    }

    /// Log-odds of the distracted class
    pub fn decision(&self, row: &FeatureRow) -> Result<f64, ArtifactError> {
        if let Some(idx) = row.iter().position(|v| !v.is_finite()) {
            return Err(ArtifactError::NonFiniteInput {
                column: FEATURE_COLUMNS[idx],
            });
        }
        let logit = dot(&self.weights, &standardize(row, &self.means, &self.scales)) + self.bias;
        if !logit.is_finite() {
            return Err(ArtifactError::DegenerateDistribution(format!(
                "log-odds overflowed to {logit}"
            )));
        }
        Ok(logit)
    }
}

impl ClassifierArtifact for LogisticRegression {
    fn classify(&self, row: &FeatureRow) -> Result<Label, ArtifactError> {
        Ok(if self.decision(row)? > 0.0 {
            Label::Distracted
        } else {
            Label::Focused
        })
    }

    fn classify_probabilities(&self, row: &FeatureRow) -> Result<ClassDistribution, ArtifactError> {
        Ok(ClassDistribution::from_distracted(sigmoid(self.decision(row)?)))
    }

    fn name(&self) -> &str {
        ALGORITHM_NAME
    }
}

fn standardization(rows: &[FeatureRow]) -> (FeatureRow, FeatureRow) {
    let n = rows.len() as f64;
    let mut means = [0.0; FEATURE_COUNT];
    for row in rows {
        for (m, x) in means.iter_mut().zip(row) {
            *m += x;
        }
    }
    means.iter_mut().for_each(|m| *m /= n);

    let mut scales = [0.0; FEATURE_COUNT];
    for row in rows {
        for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (x - m).powi(2);
        }
    }
    for s in scales.iter_mut() {
        let sd = (*s / n).sqrt();
        *s = if sd > f64::EPSILON { sd } else { 1.0 };
    }

    (means, scales)
}

fn standardize(row: &FeatureRow, means: &FeatureRow, scales: &FeatureRow) -> FeatureRow {
    let mut out = [0.0; FEATURE_COUNT];
    for (i, o) in out.iter_mut().enumerate() {
        *o = (row[i] - means[i]) / scales[i];
    }
    out
}

fn dot(a: &FeatureRow, b: &FeatureRow) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusGenerator;
    use crate::features::{FeatureVector, LabeledRecord};

    fn fitted() -> LogisticRegression {
        let corpus = CorpusGenerator::new().generate_seeded(2024);
        LogisticRegression::fit(&corpus, &TrainingOptions::default()).unwrap()
    }

    #[test]
    fn test_separates_synthetic_corpus() {
        let model = fitted();
        let holdout = CorpusGenerator::new().generate_seeded(77);

        let correct = holdout
            .records()
            .iter()
            .filter(|r| model.classify(&r.features.to_row()).unwrap() == r.label)
            .count();
        let accuracy = correct as f64 / holdout.len() as f64;
        assert!(accuracy >= 0.98, "accuracy {accuracy}");
    }

    #[test]
    fn test_classify_agrees_with_probabilities() {
        let model = fitted();
        let holdout = CorpusGenerator::new().with_per_class(50).unwrap().generate_seeded(5);
        for record in holdout.records() {
            let row = record.features.to_row();
            let label = model.classify(&row).unwrap();
            let dist = model.classify_probabilities(&row).unwrap();
            assert_eq!(label, dist.argmax());
            let total: f64 = dist.as_array().iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_active_ratio_pushes_toward_focus() {
        let model = fitted();
        let low = FeatureVector::from_session(60.0, 4, 0.3).to_row();
        let high = FeatureVector::from_session(60.0, 4, 0.97).to_row();

        let p_low = model.classify_probabilities(&low).unwrap();
        let p_high = model.classify_probabilities(&high).unwrap();
        assert!(p_high.probability(Label::Focused) > p_low.probability(Label::Focused));
    }

    #[test]
    fn test_non_finite_row_rejected() {
        let model = fitted();
        let err = model
            .classify_probabilities(&[f64::NAN, 1.0, 0.1, 0.5])
            .unwrap_err();
        assert_eq!(err, ArtifactError::NonFiniteInput { column: "duration" });
    }

    #[test]
    fn test_overflowing_row_rejected() {
        let model = fitted();
        let err = model
            .classify(&[f64::MAX, 1.0, f64::MAX, -f64::MAX])
            .unwrap_err();
        assert!(matches!(err, ArtifactError::DegenerateDistribution(_)));
    }

    #[test]
    fn test_single_class_corpus_rejected() {
        let corpus = LabeledCorpus::from(vec![LabeledRecord {
            features: FeatureVector::from_session(100.0, 1, 0.95),
            label: Label::Focused,
        }]);
        let err = LogisticRegression::fit(&corpus, &TrainingOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "TRAINING_ERROR");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let corpus = CorpusGenerator::new().with_per_class(10).unwrap().generate_seeded(4);
        let invalid = [
            TrainingOptions { epochs: 0, ..TrainingOptions::default() },
            TrainingOptions { learning_rate: f64::INFINITY, ..TrainingOptions::default() },
            TrainingOptions { l2: -1.0, ..TrainingOptions::default() },
        ];
        for options in invalid {
            let err = LogisticRegression::fit(&corpus, &options).unwrap_err();
            assert_eq!(err.kind(), "TRAINING_ERROR", "{options:?}");
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let corpus = CorpusGenerator::new().with_per_class(100).unwrap().generate_seeded(9);
        let options = TrainingOptions {
            epochs: 200,
            ..TrainingOptions::default()
        };
        assert_eq!(
            LogisticRegression::fit(&corpus, &options).unwrap(),
            LogisticRegression::fit(&corpus, &options).unwrap()
        );
    }

    #[test]
    fn test_check_rejects_zero_scale() {
        let mut model = fitted();
        model.scales[3] = 0.0;
        assert!(model.check().unwrap_err().contains("active_ratio"));
    }
}
