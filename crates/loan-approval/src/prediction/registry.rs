use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::artifact::{read_json, ArtifactError};
use super::classifiers::{ModelArtifact, ProbabilisticClassifier};
use super::domain::ModelName;

/// Directory holding one `<name>.json` per classifier below the artifact root.
pub const MODELS_DIR: &str = "models";

/// Immutable set of classifiers selectable by name.
#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<ModelName, Box<dyn ProbabilisticClassifier>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}

impl ModelRegistry {
    /// Loads every known classifier found under `<artifact_dir>/models`.
    pub fn load(artifact_dir: &Path) -> Result<Self, ArtifactError> {
        let models_dir = artifact_dir.join(MODELS_DIR);
        let mut registry = Self::default();

        for name in ModelName::ALL {
            let path = models_dir.join(format!("{}.json", name.as_str()));
            if !path.is_file() {
                continue;
            }
            let artifact: ModelArtifact = read_json(&path)?;
            registry.register_artifact(&path, name, artifact)?;
            info!(model = %name, path = %path.display(), "classifier loaded");
        }

        warn_unknown_artifacts(&models_dir);

        if registry.is_empty() {
            return Err(ArtifactError::NoModels(models_dir));
        }
        Ok(registry)
    }

    fn register_artifact(
        &mut self,
        path: &Path,
        expected: ModelName,
        artifact: ModelArtifact,
    ) -> Result<(), ArtifactError> {
        let found = artifact.model_name();
        if found != expected {
            return Err(ArtifactError::KindMismatch {
                path: path.to_path_buf(),
                expected: expected.as_str(),
                found: found.as_str(),
            });
        }
        self.insert(artifact.into_classifier()?);
        Ok(())
    }

    /// Registers a classifier under its own name, replacing any previous entry.
    pub fn insert(&mut self, classifier: Box<dyn ProbabilisticClassifier>) {
        self.models.insert(classifier.name(), classifier);
    }

    pub fn get(&self, name: ModelName) -> Option<&dyn ProbabilisticClassifier> {
        self.models.get(&name).map(|model| model.as_ref())
    }

    pub fn contains(&self, name: ModelName) -> bool {
        self.models.contains_key(&name)
    }

    /// Registered names in canonical order.
    pub fn names(&self) -> Vec<ModelName> {
        self.models.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }
}

fn warn_unknown_artifacts(models_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(models_dir) else {
        return;
    };
    let known: Vec<PathBuf> = ModelName::ALL
        .iter()
        .map(|name| models_dir.join(format!("{}.json", name.as_str())))
        .collect();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && !known.contains(&path) {
            warn!(path = %path.display(), "ignoring artifact with unrecognized model name");
        }
    }
}
