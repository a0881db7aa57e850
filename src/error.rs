//! Error types for the focus classifier

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while generating corpora, loading artifacts or scoring sessions
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Invalid session record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] ArtifactError),

    #[error("I/O failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed corpus at line {line}: {message}")]
    CorpusFormat { line: usize, message: String },

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClassifyError {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::Validation(_) => "VALIDATION_ERROR",
            ClassifyError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ClassifyError::Inference(_) => "INFERENCE_ERROR",
            ClassifyError::IoFailure { .. } => "IO_FAILURE",
            ClassifyError::CorpusFormat { .. } => "CORPUS_FORMAT_ERROR",
            ClassifyError::Training(_) => "TRAINING_ERROR",
            ClassifyError::Config(_) => "CONFIG_ERROR",
            ClassifyError::Json(_) => "JSON_ERROR",
        }
    }

    /// Whether the caller sent a bad record, as opposed to a server-side failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClassifyError::Validation(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ClassifyError::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Rejections of an untrusted session record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Field {field} is out of domain: {reason}")]
    OutOfDomain { field: &'static str, reason: String },

    #[error("Malformed record: {0}")]
    Malformed(String),
}

impl ValidationError {
    /// Name of the offending field, if the error is attributable to one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingField(field)
            | ValidationError::WrongType { field, .. }
            | ValidationError::OutOfDomain { field, .. } => Some(field),
            ValidationError::Malformed(_) => None,
        }
    }
}

/// Failures raised by a classifier artifact while scoring
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArtifactError {
    #[error("Non-finite input at column {column}")]
    NonFiniteInput { column: &'static str },

    #[error("Degenerate probability distribution: {0}")]
    DegenerateDistribution(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::MissingField("active_ratio");
        assert_eq!(err.field(), Some("active_ratio"));
        assert!(err.to_string().contains("active_ratio"));

        let err = ValidationError::Malformed("expected object".to_string());
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            ClassifyError::from(ValidationError::MissingField("duration")),
            ClassifyError::ModelUnavailable("gone".to_string()),
            ClassifyError::from(ArtifactError::Other("boom".to_string())),
            ClassifyError::io("/tmp/x.csv", io::Error::new(io::ErrorKind::Other, "disk full")),
        ];

        let kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec!["VALIDATION_ERROR", "MODEL_UNAVAILABLE", "INFERENCE_ERROR", "IO_FAILURE"]
        );
        assert!(errors[0].is_client_error());
        assert!(!errors[1].is_client_error());
    }

    #[test]
    fn test_io_failure_mentions_path() {
        let err = ClassifyError::io("/nope/corpus.csv", io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(err.to_string().contains("/nope/corpus.csv"));
    }
}
