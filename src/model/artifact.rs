//! Persisted classifier artifact
//!
//! The artifact is a JSON envelope around the fitted parameters. It records the
//! feature column order it was fit on; loading refuses any artifact whose
//! column order differs from [`FEATURE_COLUMNS`].

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::corpus::LabeledCorpus;
use crate::error::{ArtifactError, ClassifyError};
use crate::features::{FeatureRow, Label, FEATURE_COLUMNS};
use crate::model::logistic::{LogisticRegression, TrainingOptions};
use crate::model::{ClassDistribution, ClassifierArtifact};
use crate::persist::write_atomic;

/// Version of the artifact envelope layout
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A fitted model plus provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    /// Column order of the rows the model was fit on
    pub feature_columns: Vec<String>,
    pub training_rows: usize,
    pub options: TrainingOptions,
    pub model: LogisticRegression,
}

/// Accuracy of an artifact against a labeled corpus
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub rows: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl ModelArtifact {
    /// Fit a new artifact on `corpus`
    pub fn train(corpus: &LabeledCorpus, options: TrainingOptions) -> Result<Self, ClassifyError> {
        let model = LogisticRegression::fit(corpus, &options)?;
        let artifact = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            training_rows: corpus.len(),
            options,
            model,
        };
        log::info!(
            "Trained artifact {} on {} sessions",
            artifact.model_id,
            artifact.training_rows
        );
        Ok(artifact)
    }

    /// Parse and check an artifact. Any failure is reported as `ModelUnavailable`.
    pub fn from_json(json: &str) -> Result<Self, ClassifyError> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| ClassifyError::ModelUnavailable(format!("corrupt artifact: {e}")))?;
        artifact.check().map_err(ClassifyError::ModelUnavailable)?;
        Ok(artifact)
    }

    pub fn to_json(&self) -> Result<String, ClassifyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load an artifact from disk; missing, unreadable or corrupt files are `ModelUnavailable`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            ClassifyError::ModelUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let artifact = Self::from_json(&json).map_err(|e| match e {
            ClassifyError::ModelUnavailable(msg) => {
                ClassifyError::ModelUnavailable(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        log::info!(
            "Loaded artifact {} ({}) from {}",
            artifact.model_id,
            artifact.name(),
            path.display()
        );
        Ok(artifact)
    }

    /// Persist the artifact; the write is all-or-nothing
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClassifyError> {
        let path = path.as_ref();
        write_atomic(path, self.to_json()?.as_bytes())?;
        log::info!("Saved artifact {} to {}", self.model_id, path.display());
        Ok(())
    }

    /// Score every session in `corpus` and report accuracy
    pub fn evaluate(&self, corpus: &LabeledCorpus) -> Result<Evaluation, ClassifyError> {
        let mut correct = 0;
        for record in corpus.records() {
            if self.classify(&record.features.to_row())? == record.label {
                correct += 1;
            }
        }
        let rows = corpus.len();
        Ok(Evaluation {
            rows,
            correct,
            accuracy: if rows == 0 {
                0.0
            } else {
                correct as f64 / rows as f64
            },
        })
    }

    fn check(&self) -> Result<(), String> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.feature_columns.iter().map(String::as_str).ne(FEATURE_COLUMNS.iter().copied()) {
            return Err(format!(
                "artifact was fit on columns [{}], expected [{}]",
                self.feature_columns.join(", "),
                FEATURE_COLUMNS.join(", ")
            ));
        }
        self.model.check()
    }
}

impl ClassifierArtifact for ModelArtifact {
    fn classify(&self, row: &FeatureRow) -> Result<Label, ArtifactError> {
        self.model.classify(row)
    }

    fn classify_probabilities(&self, row: &FeatureRow) -> Result<ClassDistribution, ArtifactError> {
        self.model.classify_probabilities(row)
    }

    fn name(&self) -> &str {
        self.model.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusGenerator;
    use pretty_assertions::assert_eq;

    fn small_artifact() -> ModelArtifact {
        let corpus = CorpusGenerator::new().with_per_class(100).unwrap().generate_seeded(12);
        ModelArtifact::train(&corpus, TrainingOptions::default()).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let artifact = small_artifact();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        assert_eq!(loaded.model_id, artifact.model_id);
        assert_eq!(loaded.feature_columns, artifact.feature_columns);
        assert_eq!(loaded.training_rows, 200);

        // Loaded parameters must score the same
        let row = [45.0, 6.0, 0.133, 0.55];
        let before = artifact.classify_probabilities(&row).unwrap();
        let after = loaded.classify_probabilities(&row).unwrap();
        assert!((before.max() - after.max()).abs() < 1e-9);
        assert_eq!(before.argmax(), after.argmax());
    }

    #[test]
    fn test_missing_artifact_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelArtifact::load(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
    }

    #[test]
    fn test_corrupt_artifact_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ModelArtifact::load(&path).unwrap_err();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
        assert!(err.to_string().contains("corrupt.json"));
    }

    #[test]
    fn test_permuted_columns_refused() {
        let mut artifact = small_artifact();
        artifact.feature_columns.swap(1, 2);

        let err = ModelArtifact::from_json(&artifact.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, ClassifyError::ModelUnavailable(ref msg) if msg.contains("columns")));
    }

    #[test]
    fn test_unknown_format_version_refused() {
        let mut artifact = small_artifact();
        artifact.format_version = 99;

        let err = ModelArtifact::from_json(&artifact.to_json().unwrap()).unwrap_err();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
    }

    #[test]
    fn test_evaluate_reports_accuracy() {
        let artifact = small_artifact();
        let holdout = CorpusGenerator::new().with_per_class(200).unwrap().generate_seeded(13);

        let evaluation = artifact.evaluate(&holdout).unwrap();
        assert_eq!(evaluation.rows, 400);
        assert!(evaluation.accuracy >= 0.98, "{evaluation:?}");
    }
}
