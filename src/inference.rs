//! Stateless session scoring
//!
//! [`InferenceService`] validates an untrusted session record, hands the
//! features to a shared [`ClassifierArtifact`] in `FEATURE_COLUMNS` order and
//! returns a [`Verdict`]. The artifact is loaded once and never mutated, so a
//! service can be cloned across threads and called concurrently without locks.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::{ArtifactError, ClassifyError, ValidationError};
use crate::features::{FeatureVector, Label};
use crate::model::{ClassifierArtifact, ModelArtifact};

/// Scoring result for one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Predicted class
    #[serde(rename = "prediction")]
    pub label: Label,
    /// Largest class probability reported by the artifact, in [0, 1].
    /// This is not the probability of `Distracted`.
    pub confidence: f64,
}

/// Scores sessions against one immutable artifact
#[derive(Clone)]
pub struct InferenceService {
    artifact: Arc<dyn ClassifierArtifact>,
}

impl fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceService")
            .field("artifact", &self.artifact.name())
            .finish()
    }
}

impl InferenceService {
    /// Wrap an already loaded artifact
    pub fn new(artifact: Arc<dyn ClassifierArtifact>) -> Self {
        Self { artifact }
    }

    /// Load the artifact at `path`. Fails with `ModelUnavailable` if it is
    /// missing or corrupt; the service must not start in that case.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifyError> {
        let artifact = ModelArtifact::load(path)?;
        Ok(Self::new(Arc::new(artifact)))
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ClassifyError> {
        Self::load(&config.artifact_path)
    }

    pub fn artifact_name(&self) -> &str {
        self.artifact.name()
    }

    /// Score a feature vector
    pub fn score(&self, features: &FeatureVector) -> Result<Verdict, ClassifyError> {
        features.validate()?;

        let row = features.to_row();
        let label = self.artifact.classify(&row)?;
        let distribution = self.artifact.classify_probabilities(&row)?;

        // f64::max skips NaN, so every component is checked before taking the max
        let probabilities = distribution.as_array();
        if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(ArtifactError::DegenerateDistribution(format!(
                "class probabilities {probabilities:?} not all in [0, 1]"
            ))
            .into());
        }
        let confidence = distribution.max();

        log::debug!(
            "Scored session {:?} as {} ({:.3})",
            features,
            label.as_str(),
            confidence
        );
        Ok(Verdict { label, confidence })
    }

    /// Validate and score an untrusted JSON record
    pub fn score_record(&self, record: &Value) -> Result<Verdict, ClassifyError> {
        let features = FeatureVector::from_record(record)?;
        self.score(&features)
    }

    /// Score a JSON request body and return the verdict as JSON
    pub fn score_json(&self, body: &str) -> Result<String, ClassifyError> {
        let record: Value = serde_json::from_str(body)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let verdict = self.score_record(&record)?;
        Ok(serde_json::to_string(&verdict)?)
    }
}
