//! Standardization fitted at training time and replayed for every request.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::artifact::{ensure_finite, read_json, ArtifactError};
use super::domain::{Feature, FeatureVector, FEATURE_COUNT};

/// Persisted form of the scaler: per-feature mean and standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Feature values after standardization; the only input classifiers accept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledFeatures([f64; FEATURE_COUNT]);

impl ScaledFeatures {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Wraps values that are already on the scaler's scale.
    pub fn from_scaled(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let artifact: ScalerArtifact = read_json(path)?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ScalerArtifact) -> Result<Self, ArtifactError> {
        if let Some(names) = &artifact.feature_names {
            let expected: Vec<&str> = Feature::ORDER.iter().map(|f| f.name()).collect();
            if names.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(ArtifactError::invalid(
                    "scaler",
                    format!(
                        "feature_names {:?} do not match the expected order {:?}",
                        names, expected
                    ),
                ));
            }
        }

        let mean = fixed_width("mean", &artifact.mean)?;
        let mut scale = fixed_width("scale", &artifact.scale)?;
        ensure_finite("scaler", "mean", &mean)?;
        ensure_finite("scaler", "scale", &scale)?;

        for value in scale.iter_mut() {
            if *value < 0.0 {
                return Err(ArtifactError::invalid("scaler", "scale must not be negative"));
            }
            // Constant training columns carry a zero deviation; leave them centred only.
            if *value == 0.0 {
                *value = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, features: &FeatureVector) -> ScaledFeatures {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (index, value) in features.values().iter().enumerate() {
            scaled[index] = (value - self.mean[index]) / self.scale[index];
        }
        ScaledFeatures(scaled)
    }
}

fn fixed_width(what: &str, values: &[f64]) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    values.try_into().map_err(|_| {
        ArtifactError::invalid(
            "scaler",
            format!(
                "{what} has {} entries, expected {FEATURE_COUNT}",
                values.len()
            ),
        )
    })
}
