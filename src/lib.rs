//! Focus Classifier - focused vs. distracted session scoring
//!
//! A session is summarized by four features (duration, switch count, switch
//! rate, active ratio). This crate covers both sides of the model boundary:
//! synthesizing a labeled training corpus and scoring new sessions against a
//! previously fit classifier artifact.
//!
//! ## Modules
//!
//! - **features**: the shared feature vector and its column order
//! - **corpus**: synthetic corpus generation and the CSV codec
//! - **model**: the classifier artifact interface and the bundled implementation
//! - **inference**: the stateless scoring service

pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;
mod persist;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ServiceConfig;
pub use corpus::{CorpusGenerator, LabeledCorpus, SamplingProfile};
pub use error::{ArtifactError, ClassifyError, ValidationError};
pub use features::{FeatureVector, Label, LabeledRecord, CORPUS_COLUMNS, FEATURE_COLUMNS};
pub use inference::{InferenceService, Verdict};
pub use model::{ClassDistribution, ClassifierArtifact, ModelArtifact, TrainingOptions};

/// Library version
pub const FOCUS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "focus-classifier";
