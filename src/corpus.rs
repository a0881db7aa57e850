//! Synthetic training corpus
//!
//! Generates labeled sessions from two sampling profiles, one per class, and
//! reads/writes them as a flat CSV table. The profiles overlap only weakly
//! (durations 30-90, switch counts 3-4), so a working classifier should separate
//! the generated classes almost perfectly.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::{DEFAULT_SAMPLES_PER_CLASS, MAX_SAMPLES_PER_CLASS};
use crate::error::ClassifyError;
use crate::features::{FeatureVector, Label, LabeledRecord, CORPUS_COLUMNS};
use crate::persist::write_atomic;

/// Stored precision of `duration` (decimal places)
pub const DURATION_DECIMALS: usize = 2;
/// Stored precision of `switch_rate` (decimal places)
pub const SWITCH_RATE_DECIMALS: usize = 3;
/// Stored precision of `active_ratio` (decimal places)
pub const ACTIVE_RATIO_DECIMALS: usize = 2;

/// Smallest duration lower bound a profile may use; keeps rounded durations non-zero
const MIN_DURATION: f64 = 0.01;

/// Sampling ranges for one class
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingProfile {
    label: Label,
    duration: (f64, f64),
    switch_count: (u32, u32),
    active_ratio: (f64, f64),
}

impl SamplingProfile {
    /// Create a profile. Float ranges are sampled uniformly, `switch_count`
    /// uniformly over the inclusive integer range.
    pub fn new(
        label: Label,
        duration: (f64, f64),
        switch_count: (u32, u32),
        active_ratio: (f64, f64),
    ) -> Result<Self, ClassifyError> {
        let invalid = |what: &str| {
            ClassifyError::Config(format!("{} profile: {what}", label.as_str()))
        };

        if !(duration.0.is_finite() && duration.1.is_finite()) || duration.0 >= duration.1 {
            return Err(invalid("duration range must be finite and non-empty"));
        }
        if duration.0 < MIN_DURATION {
            return Err(invalid("duration lower bound must be at least 0.01 minutes"));
        }
        if switch_count.0 > switch_count.1 {
            return Err(invalid("switch_count range is empty"));
        }
        if !(0.0..=1.0).contains(&active_ratio.0)
            || !(0.0..=1.0).contains(&active_ratio.1)
            || active_ratio.0 >= active_ratio.1
        {
            return Err(invalid("active_ratio range must be a non-empty subrange of [0, 1]"));
        }

        Ok(Self {
            label,
            duration,
            switch_count,
            active_ratio,
        })
    }

    /// Long sessions, few switches, mostly active
    pub fn focused() -> Self {
        Self {
            label: Label::Focused,
            duration: (30.0, 300.0),
            switch_count: (0, 4),
            active_ratio: (0.90, 0.99),
        }
    }

    /// Short sessions, many switches, often inactive
    pub fn distracted() -> Self {
        Self {
            label: Label::Distracted,
            duration: (5.0, 90.0),
            switch_count: (3, 20),
            active_ratio: (0.25, 0.70),
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    /// Draw one session.
    ///
    /// The switch rate is derived from the rounded duration so stored rows stay
    /// consistent with `switch_count / duration` up to rate rounding.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> LabeledRecord {
        let duration = round_to(
            rng.gen_range(self.duration.0..self.duration.1),
            DURATION_DECIMALS,
        );
        let switch_count = rng.gen_range(self.switch_count.0..=self.switch_count.1);
        let switch_rate = round_to(switch_count as f64 / duration, SWITCH_RATE_DECIMALS);
        let active_ratio = round_to(
            rng.gen_range(self.active_ratio.0..self.active_ratio.1),
            ACTIVE_RATIO_DECIMALS,
        );

        LabeledRecord {
            features: FeatureVector {
                duration,
                switch_count,
                switch_rate,
                active_ratio,
            },
            label: self.label,
        }
    }
}

/// Produces labeled corpora from a focused and a distracted profile
#[derive(Debug, Clone)]
pub struct CorpusGenerator {
    per_class: usize,
    focused: SamplingProfile,
    distracted: SamplingProfile,
}

impl Default for CorpusGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusGenerator {
    /// Default profiles, 500 sessions per class
    pub fn new() -> Self {
        Self {
            per_class: DEFAULT_SAMPLES_PER_CLASS,
            focused: SamplingProfile::focused(),
            distracted: SamplingProfile::distracted(),
        }
    }

    /// Set the sessions per class; at most `MAX_SAMPLES_PER_CLASS`
    pub fn with_per_class(mut self, per_class: usize) -> Result<Self, ClassifyError> {
        if per_class > MAX_SAMPLES_PER_CLASS {
            return Err(ClassifyError::Config(format!(
                "per_class {per_class} exceeds {MAX_SAMPLES_PER_CLASS}"
            )));
        }
        self.per_class = per_class;
        Ok(self)
    }

    /// Replace both profiles. Each profile must carry its own class label.
    pub fn with_profiles(
        mut self,
        focused: SamplingProfile,
        distracted: SamplingProfile,
    ) -> Result<Self, ClassifyError> {
        if focused.label() != Label::Focused || distracted.label() != Label::Distracted {
            return Err(ClassifyError::Config(
                "profiles must be labeled focused and distracted respectively".to_string(),
            ));
        }
        self.focused = focused;
        self.distracted = distracted;
        Ok(self)
    }

    pub fn per_class(&self) -> usize {
        self.per_class
    }

    /// Generate all focused sessions followed by all distracted sessions.
    ///
    /// The output is not shuffled; see [`LabeledCorpus::shuffled`].
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> LabeledCorpus {
        let mut records = Vec::with_capacity(self.per_class * 2);
        for profile in [&self.focused, &self.distracted] {
            for _ in 0..self.per_class {
                records.push(profile.sample(rng));
            }
        }
        log::debug!(
            "Generated {} sessions ({} per class)",
            records.len(),
            self.per_class
        );
        LabeledCorpus { records }
    }

    /// Reproducible generation from a seed
    pub fn generate_seeded(&self, seed: u64) -> LabeledCorpus {
        self.generate(&mut StdRng::seed_from_u64(seed))
    }

    /// Generation from thread-local entropy
    pub fn generate_random(&self) -> LabeledCorpus {
        self.generate(&mut rand::thread_rng())
    }

    /// Generate a fresh corpus and write it to `path`, replacing any prior file
    pub fn generate_to(
        &self,
        path: impl AsRef<Path>,
        seed: Option<u64>,
    ) -> Result<LabeledCorpus, ClassifyError> {
        let corpus = match seed {
            Some(seed) => self.generate_seeded(seed),
            None => self.generate_random(),
        };
        corpus.write_csv(path)?;
        Ok(corpus)
    }
}

/// An immutable, ordered set of labeled sessions
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledCorpus {
    records: Vec<LabeledRecord>,
}

impl LabeledCorpus {
    pub fn records(&self) -> &[LabeledRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of sessions carrying `label`
    pub fn count_for(&self, label: Label) -> usize {
        self.records.iter().filter(|r| r.label == label).count()
    }

    /// A new corpus with the same records in random order
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> LabeledCorpus {
        let mut records = self.records.clone();
        records.shuffle(rng);
        LabeledCorpus { records }
    }

    /// Render as CSV: header row, then one line per session
    pub fn to_csv_string(&self) -> String {
        let mut out = String::with_capacity(32 * (self.records.len() + 1));
        out.push_str(&CORPUS_COLUMNS.join(","));
        out.push('\n');

        for record in &self.records {
            let f = &record.features;
            out.push_str(&format!(
                "{:.dp$},{},{:.rp$},{:.ap$},{}\n",
                f.duration,
                f.switch_count,
                f.switch_rate,
                f.active_ratio,
                u8::from(record.label),
                dp = DURATION_DECIMALS,
                rp = SWITCH_RATE_DECIMALS,
                ap = ACTIVE_RATIO_DECIMALS,
            ));
        }
        out
    }

    /// Parse CSV produced by [`LabeledCorpus::to_csv_string`] or an equivalent writer
    pub fn from_csv_str(input: &str) -> Result<Self, ClassifyError> {
        let mut lines = input
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')));

        let header = lines.next().map(|(_, line)| line).unwrap_or_default();
        if header.split(',').map(str::trim).ne(CORPUS_COLUMNS.iter().copied()) {
            return Err(ClassifyError::CorpusFormat {
                line: 1,
                message: format!(
                    "expected header `{}`, got `{header}`",
                    CORPUS_COLUMNS.join(",")
                ),
            });
        }

        let mut records = Vec::new();
        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            records.push(parse_row(line).map_err(|message| ClassifyError::CorpusFormat {
                line: line_no,
                message,
            })?);
        }

        Ok(Self { records })
    }

    /// Write the corpus to `path`. The write is all-or-nothing and replaces any prior file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ClassifyError> {
        let path = path.as_ref();
        write_atomic(path, self.to_csv_string().as_bytes())?;
        log::info!("Wrote {} sessions to {}", self.len(), path.display());
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ClassifyError::io(path, e))?;
        Self::from_csv_str(&contents)
    }
}

impl From<Vec<LabeledRecord>> for LabeledCorpus {
    fn from(records: Vec<LabeledRecord>) -> Self {
        Self { records }
    }
}

fn parse_row(line: &str) -> Result<LabeledRecord, String> {
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    if cells.len() != CORPUS_COLUMNS.len() {
        return Err(format!(
            "expected {} columns, got {}",
            CORPUS_COLUMNS.len(),
            cells.len()
        ));
    }

    let number = |idx: usize| {
        cells[idx]
            .parse::<f64>()
            .map_err(|e| format!("{}: {e}", CORPUS_COLUMNS[idx]))
    };

    let features = FeatureVector {
        duration: number(0)?,
        switch_count: cells[1]
            .parse::<u32>()
            .map_err(|e| format!("{}: {e}", CORPUS_COLUMNS[1]))?,
        switch_rate: number(2)?,
        active_ratio: number(3)?,
    };
    features.validate().map_err(|e| e.to_string())?;

    let label = cells[4]
        .parse::<u8>()
        .map_err(|e| e.to_string())
        .and_then(Label::try_from)
        .map_err(|e| format!("{}: {e}", CORPUS_COLUMNS[4]))?;

    Ok(LabeledRecord { features, label })
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
