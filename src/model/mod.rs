//! Classifier artifacts
//!
//! The inference service only sees a [`ClassifierArtifact`]: something that maps
//! a feature row to a label and to a class distribution. The fitting algorithm
//! and on-disk format live behind it and can be swapped freely.
//!
//! The bundled implementation is an L2-regularized logistic regression over
//! standardized features ([`LogisticRegression`]), persisted as a JSON
//! [`ModelArtifact`].

pub mod artifact;
pub mod logistic;

pub use artifact::{Evaluation, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use logistic::{LogisticRegression, TrainingOptions};

use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;
use crate::features::{FeatureRow, Label};

/// A fitted, immutable classifier.
///
/// Implementations are shared read-only across concurrent scoring calls and
/// must not keep per-call mutable state.
pub trait ClassifierArtifact: Send + Sync {
    /// Predict the class of a row laid out in `FEATURE_COLUMNS` order
    fn classify(&self, row: &FeatureRow) -> Result<Label, ArtifactError>;

    /// Probability of each class for the row
    fn classify_probabilities(&self, row: &FeatureRow) -> Result<ClassDistribution, ArtifactError>;

    /// Short identifier of the underlying algorithm
    fn name(&self) -> &str;
}

/// Probability mass per [`Label`], indexed by `Label::index`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassDistribution([f64; 2]);

impl ClassDistribution {
    pub fn new(probabilities: [f64; 2]) -> Self {
        Self(probabilities)
    }

    /// Distribution with `p` on distracted and `1 - p` on focused
    pub fn from_distracted(p: f64) -> Self {
        Self([1.0 - p, p])
    }

    pub fn probability(&self, label: Label) -> f64 {
        self.0[label.index()]
    }

    /// Largest class probability
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Most probable label; ties resolve to `Focused`
    pub fn argmax(&self) -> Label {
        if self.probability(Label::Distracted) > self.probability(Label::Focused) {
            Label::Distracted
        } else {
            Label::Focused
        }
    }

    pub fn as_array(&self) -> [f64; 2] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_max_and_argmax() {
        let dist = ClassDistribution::from_distracted(0.8);
        assert!((dist.max() - 0.8).abs() < 1e-12);
        assert_eq!(dist.argmax(), Label::Distracted);

        let dist = ClassDistribution::from_distracted(0.1);
        assert!((dist.max() - 0.9).abs() < 1e-12);
        assert_eq!(dist.argmax(), Label::Focused);
    }

    #[test]
    fn test_distribution_tie_is_focused() {
        assert_eq!(ClassDistribution::new([0.5, 0.5]).argmax(), Label::Focused);
    }

    #[test]
    fn test_probability_by_label() {
        let dist = ClassDistribution::new([0.3, 0.7]);
        assert_eq!(dist.probability(Label::Focused), 0.3);
        assert_eq!(dist.probability(Label::Distracted), 0.7);
    }
}
