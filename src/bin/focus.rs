//! Focus CLI - Command-line interface for the focus classifier
//!
//! Commands:
//! - generate: Write a synthetic labeled corpus (CSV)
//! - train: Fit a classifier artifact on a corpus
//! - predict: Score session records (NDJSON) against an artifact
//! - doctor: Diagnose artifact health and the feature column contract
//! - schema: Print record, verdict and corpus schemas

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;

use focus_classifier::config::{DEFAULT_ARTIFACT_FILE, DEFAULT_CORPUS_FILE, DEFAULT_SAMPLES_PER_CLASS};
use focus_classifier::{
    ClassifierArtifact, ClassifyError, CorpusGenerator, FeatureVector, InferenceService, Label, LabeledCorpus,
    ModelArtifact, ServiceConfig, TrainingOptions, CORPUS_COLUMNS, FEATURE_COLUMNS, FOCUS_VERSION,
    PRODUCER_NAME,
};

/// Focus - classify activity sessions as focused or distracted
#[derive(Parser)]
#[command(name = "focus")]
#[command(author = "Synheart AI Inc")]
#[command(version = FOCUS_VERSION)]
#[command(about = "Generate training corpora and score activity sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic labeled corpus as CSV
    Generate {
        /// Output file path (replaced if it exists)
        #[arg(short, long, default_value = DEFAULT_CORPUS_FILE)]
        output: PathBuf,

        /// Sessions per class
        #[arg(long, default_value_t = DEFAULT_SAMPLES_PER_CLASS)]
        per_class: usize,

        /// Seed for a reproducible corpus
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Fit a classifier artifact on a corpus
    Train {
        /// Corpus CSV path
        #[arg(short, long, default_value = DEFAULT_CORPUS_FILE)]
        corpus: PathBuf,

        /// Artifact output path
        #[arg(short, long, default_value = DEFAULT_ARTIFACT_FILE)]
        output: PathBuf,

        /// Shuffle the corpus with this seed before fitting
        #[arg(long)]
        shuffle_seed: Option<u64>,

        /// Gradient descent epochs
        #[arg(long, default_value_t = TrainingOptions::default().epochs)]
        epochs: usize,

        /// Gradient descent step size
        #[arg(long, default_value_t = TrainingOptions::default().learning_rate)]
        learning_rate: f64,

        /// L2 penalty on the weights
        #[arg(long, default_value_t = TrainingOptions::default().l2)]
        l2: f64,

        /// Output the training report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score session records (one JSON object per line)
    Predict {
        /// Artifact path (defaults to FOCUS_MODEL_PATH or focus_model.json next to the binary)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Buffer output instead of flushing after each record
        #[arg(long)]
        no_flush: bool,
    },

    /// Diagnose artifact health and configuration
    Doctor {
        /// Artifact path (defaults to FOCUS_MODEL_PATH or focus_model.json next to the binary)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Scoring request record
    Record,
    /// Scoring response
    Verdict,
    /// Training corpus CSV
    Corpus,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FocusCliError> {
    match cli.command {
        Commands::Generate {
            output,
            per_class,
            seed,
        } => cmd_generate(&output, per_class, seed),

        Commands::Train {
            corpus,
            output,
            shuffle_seed,
            epochs,
            learning_rate,
            l2,
            json,
        } => {
            let options = TrainingOptions {
                epochs,
                learning_rate,
                l2,
            };
            cmd_train(&corpus, &output, shuffle_seed, options, json)
        }

        Commands::Predict {
            model,
            input,
            no_flush,
        } => cmd_predict(model.as_deref(), &input, !no_flush),

        Commands::Doctor { model, json } => cmd_doctor(model.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_generate(output: &Path, per_class: usize, seed: Option<u64>) -> Result<(), FocusCliError> {
    if per_class == 0 {
        return Err(FocusCliError::EmptyCorpus);
    }

    let corpus = CorpusGenerator::new()
        .with_per_class(per_class)?
        .generate_to(output, seed)?;

    println!(
        "Generated {} sessions ({} focused, {} distracted): {}",
        corpus.len(),
        corpus.count_for(Label::Focused),
        corpus.count_for(Label::Distracted),
        output.display()
    );
    Ok(())
}

fn cmd_train(
    corpus_path: &Path,
    output: &Path,
    shuffle_seed: Option<u64>,
    options: TrainingOptions,
    json: bool,
) -> Result<(), FocusCliError> {
    let mut corpus = LabeledCorpus::read_csv(corpus_path)?;
    if corpus.is_empty() {
        return Err(FocusCliError::EmptyCorpus);
    }

    // The generator emits class blocks; shuffling is the trainer's job
    if let Some(seed) = shuffle_seed {
        corpus = corpus.shuffled(&mut StdRng::seed_from_u64(seed));
    }

    let artifact = ModelArtifact::train(&corpus, options)?;
    let evaluation = artifact.evaluate(&corpus)?;
    artifact.save(output)?;

    let report = TrainReport {
        model_id: artifact.model_id.to_string(),
        algorithm: artifact.name().to_string(),
        training_rows: artifact.training_rows,
        training_accuracy: evaluation.accuracy,
        output: output.display().to_string(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Training Report");
        println!("===============");
        println!("Model ID:  {}", report.model_id);
        println!("Algorithm: {}", report.algorithm);
        println!("Rows:      {}", report.training_rows);
        println!("Accuracy:  {:.4}", report.training_accuracy);
        println!("Saved to:  {}", report.output);
    }

    Ok(())
}

fn cmd_predict(model: Option<&Path>, input: &Path, flush: bool) -> Result<(), FocusCliError> {
    // A missing or corrupt artifact is fatal before any record is read
    let service = InferenceService::from_config(&resolve_config(model)?)?;

    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Reading session records from stdin, one JSON object per line");
        }
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut stdout = io::stdout();
    let mut failed = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        // Bad records are reported in-line; the stream keeps going
        match service.score_json(trimmed) {
            Ok(verdict) => writeln!(stdout, "{}", verdict)?,
            Err(e) => {
                failed += 1;
                log::warn!("Record {} rejected: {}", index + 1, e);
                let report = RecordError {
                    line: index + 1,
                    error: CliError::from(FocusCliError::Classify(e)),
                };
                writeln!(stdout, "{}", serde_json::to_string(&report)?)?;
            }
        }

        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;

    if failed > 0 {
        Err(FocusCliError::RecordsFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_doctor(model: Option<&Path>, json: bool) -> Result<(), FocusCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("focus-classifier {}", FOCUS_VERSION),
    });

    checks.push(DoctorCheck {
        name: "feature_columns".to_string(),
        status: CheckStatus::Ok,
        message: format!("Feature order: {}", FEATURE_COLUMNS.join(", ")),
    });

    match resolve_config(model) {
        Ok(config) => checks.extend(check_artifact(&config.artifact_path)),
        Err(e) => checks.push(DoctorCheck {
            name: "artifact".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming predict ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FOCUS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Focus Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FocusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// Load the artifact and score one session from the middle of each training profile
fn check_artifact(path: &Path) -> Vec<DoctorCheck> {
    let service = match InferenceService::load(path) {
        Ok(service) => service,
        Err(e) => {
            return vec![DoctorCheck {
                name: "artifact".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }]
        }
    };

    let mut checks = vec![DoctorCheck {
        name: "artifact".to_string(),
        status: CheckStatus::Ok,
        message: format!("Loaded {} ({})", path.display(), service.artifact_name()),
    }];

    let canonical_sessions = [
        (Label::Focused, FeatureVector::from_session(200.0, 1, 0.95)),
        (Label::Distracted, FeatureVector::from_session(20.0, 15, 0.40)),
    ];
    for (expected, features) in canonical_sessions {
        let name = format!("session_{}", expected.as_str());
        checks.push(match service.score(&features) {
            Ok(verdict) if verdict.label == expected => DoctorCheck {
                name,
                status: CheckStatus::Ok,
                message: format!(
                    "Typical {} session scored correctly ({:.3})",
                    expected.as_str(),
                    verdict.confidence
                ),
            },
            Ok(verdict) => DoctorCheck {
                name,
                status: CheckStatus::Warning,
                message: format!(
                    "Typical {} session scored as {} ({:.3}); check the training pipeline",
                    expected.as_str(),
                    verdict.label.as_str(),
                    verdict.confidence
                ),
            },
            Err(e) => DoctorCheck {
                name,
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    checks
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), FocusCliError> {
    match schema_type {
        SchemaType::Record => {
            println!("Scoring request: one JSON object");
            println!();
            println!("- duration: number, minutes, > 0");
            println!("- switch_count: integer, >= 0");
            println!("- switch_rate: number, expected to equal switch_count / duration (not checked)");
            println!("- active_ratio: number, fraction of the session spent active (range not checked)");
        }
        SchemaType::Verdict => {
            println!("Scoring response: one JSON object");
            println!();
            println!("- prediction: 0 (focused) or 1 (distracted)");
            println!("- confidence: number in [0, 1], probability of the predicted class");
        }
        SchemaType::Corpus => {
            println!("Training corpus: comma-separated, header row first");
            println!();
            println!("{}", CORPUS_COLUMNS.join(","));
            println!();
            println!("Rows are all focused sessions (label 0) followed by all distracted sessions (label 1).");
        }
    }

    Ok(())
}

fn resolve_config(model: Option<&Path>) -> Result<ServiceConfig, ClassifyError> {
    match model {
        Some(path) => Ok(ServiceConfig::new(path)),
        None => ServiceConfig::from_env(),
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum FocusCliError {
    Io(io::Error),
    Classify(ClassifyError),
    Json(serde_json::Error),
    EmptyCorpus,
    RecordsFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FocusCliError {
    fn from(e: io::Error) -> Self {
        FocusCliError::Io(e)
    }
}

impl From<ClassifyError> for FocusCliError {
    fn from(e: ClassifyError) -> Self {
        FocusCliError::Classify(e)
    }
}

impl From<serde_json::Error> for FocusCliError {
    fn from(e: serde_json::Error) -> Self {
        FocusCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    hint: Option<String>,
}

impl From<FocusCliError> for CliError {
    fn from(e: FocusCliError) -> Self {
        match e {
            FocusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                field: None,
                hint: Some("Check file paths and permissions".to_string()),
            },
            FocusCliError::Classify(e) => {
                let field = match &e {
                    ClassifyError::Validation(v) => v.field().map(str::to_string),
                    _ => None,
                };
                let hint = match &e {
                    ClassifyError::Validation(_) => Some("Run 'focus schema record' for the expected fields"),
                    ClassifyError::ModelUnavailable(_) => Some("Train an artifact with 'focus train' or set FOCUS_MODEL_PATH"),
                    ClassifyError::IoFailure { .. } => Some("Check the destination directory exists and is writable"),
                    ClassifyError::CorpusFormat { .. } => Some("Regenerate the corpus with 'focus generate'"),
                    _ => None,
                };
                CliError {
                    code: e.kind().to_string(),
                    message: e.to_string(),
                    field,
                    hint: hint.map(str::to_string),
                }
            }
            FocusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                field: None,
                hint: None,
            },
            FocusCliError::EmptyCorpus => CliError {
                code: "EMPTY_CORPUS".to_string(),
                message: "Corpus has no sessions".to_string(),
                field: None,
                hint: Some("Use a positive --per-class".to_string()),
            },
            FocusCliError::RecordsFailed(count) => CliError {
                code: "RECORDS_FAILED".to_string(),
                message: format!("{} records could not be scored", count),
                field: None,
                hint: Some("See the per-line errors in the output".to_string()),
            },
            FocusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                field: None,
                hint: Some("Review the doctor report above".to_string()),
            },
        }
    }
}

#[derive(serde::Serialize)]
struct RecordError {
    line: usize,
    error: CliError,
}

#[derive(serde::Serialize)]
struct TrainReport {
    model_id: String,
    algorithm: String,
    training_rows: usize,
    training_accuracy: f64,
    output: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predict_flush(args: &[&str]) -> bool {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Predict { no_flush, .. } => !no_flush,
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_predict_flushes_by_default() {
        assert!(predict_flush(&["focus", "predict"]));
    }

    #[test]
    fn test_predict_no_flush_flag() {
        assert!(!predict_flush(&["focus", "predict", "--no-flush"]));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
