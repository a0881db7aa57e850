//! Deployment configuration
//!
//! Defaults for the corpus generator and the location of the classifier
//! artifact. The artifact is resolved relative to the running executable so a
//! service binary and its model can be shipped side by side.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ClassifyError;

/// File name of the classifier artifact next to the service executable
pub const DEFAULT_ARTIFACT_FILE: &str = "focus_model.json";

/// File name of the generated training corpus
pub const DEFAULT_CORPUS_FILE: &str = "session_data_1000.csv";

/// Default number of generated sessions per class
pub const DEFAULT_SAMPLES_PER_CLASS: usize = 500;

/// Upper bound on generated sessions per class
pub const MAX_SAMPLES_PER_CLASS: usize = 10_000_000;

/// Environment variable overriding the artifact location
pub const MODEL_PATH_ENV: &str = "FOCUS_MODEL_PATH";

/// Where the inference service finds its artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub artifact_path: PathBuf,
}

impl ServiceConfig {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
        }
    }

    /// Resolve the artifact path from `FOCUS_MODEL_PATH`, falling back to
    /// [`DEFAULT_ARTIFACT_FILE`] in the executable's directory.
    pub fn from_env() -> Result<Self, ClassifyError> {
        let base = deployment_dir()?;
        Ok(Self::resolve(env::var_os(MODEL_PATH_ENV), &base))
    }

    /// Resolve an optional override against a deployment directory.
    /// Relative overrides are taken relative to `base`.
    pub fn resolve(override_path: Option<OsString>, base: &Path) -> Self {
        let artifact_path = match override_path {
            Some(raw) if !raw.is_empty() => {
                let path = PathBuf::from(raw);
                if path.is_absolute() {
                    path
                } else {
                    base.join(path)
                }
            }
            _ => base.join(DEFAULT_ARTIFACT_FILE),
        };
        Self { artifact_path }
    }
}

/// Directory containing the running executable
pub fn deployment_dir() -> Result<PathBuf, ClassifyError> {
    let exe = env::current_exe()
        .map_err(|e| ClassifyError::Config(format!("cannot locate executable: {e}")))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ClassifyError::Config(format!("{} has no parent directory", exe.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_artifact_next_to_executable() {
        let config = ServiceConfig::resolve(None, Path::new("/opt/focus/bin"));
        assert_eq!(
            config.artifact_path,
            PathBuf::from("/opt/focus/bin/focus_model.json")
        );
    }

    #[test]
    fn test_relative_override_resolved_against_base() {
        let config = ServiceConfig::resolve(
            Some(OsString::from("models/v2.json")),
            Path::new("/opt/focus/bin"),
        );
        assert_eq!(
            config.artifact_path,
            PathBuf::from("/opt/focus/bin/models/v2.json")
        );
    }

    #[test]
    fn test_absolute_override_kept() {
        let absolute = env::temp_dir().join("model.json");
        let config =
            ServiceConfig::resolve(Some(absolute.clone().into_os_string()), Path::new("/opt"));
        assert_eq!(config.artifact_path, absolute);
    }

    #[test]
    fn test_empty_override_ignored() {
        let config = ServiceConfig::resolve(Some(OsString::new()), Path::new("/srv"));
        assert_eq!(config.artifact_path, PathBuf::from("/srv/focus_model.json"));
    }

    #[test]
    fn test_deployment_dir_exists() {
        assert!(deployment_dir().unwrap().is_dir());
    }
}
