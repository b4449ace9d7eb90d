use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

/// Failure while reading or checking a persisted scaler or classifier.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("unable to open artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to decode artifact {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid {artifact} artifact: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },
    #[error("artifact {path} declares kind '{found}' but is registered as '{expected}'")]
    KindMismatch {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },
    #[error("no classifier artifacts found under {0}")]
    NoModels(PathBuf),
    #[error("default model '{0}' is not among the loaded classifiers")]
    MissingDefault(&'static str),
}

impl ArtifactError {
    pub(crate) fn invalid(artifact: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn ensure_finite(
    artifact: &'static str,
    what: &str,
    values: &[f64],
) -> Result<(), ArtifactError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(ArtifactError::invalid(
            artifact,
            format!("{what}[{index}] is not finite"),
        )),
        None => Ok(()),
    }
}
