//! Session feature vector
//!
//! The four-feature session summary shared by corpus generation and inference.
//! Column order is declared exactly once, in [`FEATURE_COLUMNS`]; the CSV codec,
//! the persisted artifact metadata and the row handed to a classifier all derive
//! from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Number of features in a session vector
pub const FEATURE_COUNT: usize = 4;

/// Feature column names, in the order the classifier was fit on
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] =
    ["duration", "switch_count", "switch_rate", "active_ratio"];

/// Name of the training label column
pub const LABEL_COLUMN: &str = "label";

/// Full corpus header: features followed by the label
pub const CORPUS_COLUMNS: [&str; FEATURE_COUNT + 1] = [
    FEATURE_COLUMNS[0],
    FEATURE_COLUMNS[1],
    FEATURE_COLUMNS[2],
    FEATURE_COLUMNS[3],
    LABEL_COLUMN,
];

/// A feature vector laid out in [`FEATURE_COLUMNS`] order
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Behavioral class of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Label {
    Focused = 0,
    Distracted = 1,
}

impl Label {
    /// All labels in index order
    pub const ALL: [Label; 2] = [Label::Focused, Label::Distracted];

    /// Position of this label in a class distribution
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Focused => "focused",
            Label::Distracted => "distracted",
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label as u8
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Focused),
            1 => Ok(Label::Distracted),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

/// Four-feature summary of one activity session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Session length in minutes (strictly positive)
    pub duration: f64,
    /// Context/tab switches during the session
    pub switch_count: u32,
    /// Switches per minute; expected to equal `switch_count / duration`
    pub switch_rate: f64,
    /// Fraction of the session spent active
    pub active_ratio: f64,
}

impl FeatureVector {
    /// Build a vector from raw session measurements, deriving the switch rate.
    ///
    /// `duration` must be strictly positive; this is not checked here.
    pub fn from_session(duration: f64, switch_count: u32, active_ratio: f64) -> Self {
        Self {
            duration,
            switch_count,
            switch_rate: switch_count as f64 / duration,
            active_ratio,
        }
    }

    /// Check the inference-time validity rules.
    ///
    /// `switch_rate` is not cross-checked against the other two fields and
    /// `active_ratio` is not range-checked; callers are trusted on both.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ValidationError::OutOfDomain {
                field: "duration",
                reason: format!("must be a positive finite number, got {}", self.duration),
            });
        }
        if !self.switch_rate.is_finite() {
            return Err(ValidationError::OutOfDomain {
                field: "switch_rate",
                reason: "must be finite".to_string(),
            });
        }
        if !self.active_ratio.is_finite() {
            return Err(ValidationError::OutOfDomain {
                field: "active_ratio",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate an untrusted JSON record.
    ///
    /// Unknown keys are ignored. Integral floats such as `3.0` are accepted
    /// for `switch_count`.
    pub fn from_record(record: &Value) -> Result<Self, ValidationError> {
        let fields = record
            .as_object()
            .ok_or_else(|| ValidationError::Malformed("expected a JSON object".to_string()))?;

        let vector = Self {
            duration: number_field(fields, "duration")?,
            switch_count: count_field(fields, "switch_count")?,
            switch_rate: number_field(fields, "switch_rate")?,
            active_ratio: number_field(fields, "active_ratio")?,
        };
        vector.validate()?;
        Ok(vector)
    }

    /// Lay the features out in [`FEATURE_COLUMNS`] order
    pub fn to_row(&self) -> FeatureRow {
        [
            self.duration,
            self.switch_count as f64,
            self.switch_rate,
            self.active_ratio,
        ]
    }
}

/// A feature vector with its ground-truth class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub features: FeatureVector,
    pub label: Label,
}

fn required<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a Value, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn number_field(fields: &Map<String, Value>, name: &'static str) -> Result<f64, ValidationError> {
    required(fields, name)?
        .as_f64()
        .ok_or(ValidationError::WrongType {
            field: name,
            expected: "a number",
        })
}

fn count_field(fields: &Map<String, Value>, name: &'static str) -> Result<u32, ValidationError> {
    let value = required(fields, name)?;
    let wrong_type = ValidationError::WrongType {
        field: name,
        expected: "a non-negative integer",
    };

    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(|_| ValidationError::OutOfDomain {
            field: name,
            reason: format!("{n} exceeds {}", u32::MAX),
        });
    }
    if let Some(n) = value.as_i64() {
        return Err(ValidationError::OutOfDomain {
            field: name,
            reason: format!("must be non-negative, got {n}"),
        });
    }
    match value.as_f64() {
        Some(x) if x.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&x) => Ok(x as u32),
        Some(x) if x < 0.0 => Err(ValidationError::OutOfDomain {
            field: name,
            reason: format!("must be non-negative, got {x}"),
        }),
        Some(x) if x.fract() == 0.0 => Err(ValidationError::OutOfDomain {
            field: name,
            reason: format!("{x} exceeds {}", u32::MAX),
        }),
        _ => Err(wrong_type),
    }
}
