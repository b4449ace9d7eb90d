use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::ProbabilisticClassifier;
use crate::prediction::artifact::{ensure_finite, ArtifactError};
use crate::prediction::domain::{ModelName, FEATURE_COUNT};
use crate::prediction::scaler::ScaledFeatures;

const ARTIFACT: &str = "knn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborWeights {
    #[default]
    Uniform,
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| x - y);
        match self {
            DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            DistanceMetric::Manhattan => diffs.map(f64::abs).sum(),
        }
    }
}

/// Persisted neighbour set. Samples are stored on the scaler's scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnArtifact {
    pub k: usize,
    #[serde(default)]
    pub weights: NeighborWeights,
    #[serde(default)]
    pub metric: DistanceMetric,
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

#[derive(Debug)]
pub struct KNearestNeighbors {
    k: usize,
    weights: NeighborWeights,
    metric: DistanceMetric,
    samples: Array2<f64>,
    labels: Array1<u8>,
}

impl TryFrom<KnnArtifact> for KNearestNeighbors {
    type Error = ArtifactError;

    fn try_from(artifact: KnnArtifact) -> Result<Self, Self::Error> {
        let count = artifact.samples.len();
        if count == 0 {
            return Err(ArtifactError::invalid(ARTIFACT, "no training samples"));
        }
        if artifact.labels.len() != count {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!("{} labels for {count} samples", artifact.labels.len()),
            ));
        }
        if artifact.k == 0 || artifact.k > count {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!("k must be between 1 and {count}, found {}", artifact.k),
            ));
        }
        if artifact.labels.iter().any(|label| *label > 1) {
            return Err(ArtifactError::invalid(ARTIFACT, "labels must be 0 or 1"));
        }
        if let Some(row) = artifact
            .samples
            .iter()
            .position(|sample| sample.len() != FEATURE_COUNT)
        {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!("sample {row} does not have {FEATURE_COUNT} features"),
            ));
        }

        let flat: Vec<f64> = artifact.samples.into_iter().flatten().collect();
        ensure_finite(ARTIFACT, "samples", &flat)?;
        let samples = Array2::from_shape_vec((count, FEATURE_COUNT), flat)
            .map_err(|err| ArtifactError::invalid(ARTIFACT, err.to_string()))?;

        Ok(Self {
            k: artifact.k,
            weights: artifact.weights,
            metric: artifact.metric,
            samples,
            labels: Array1::from_vec(artifact.labels),
        })
    }
}

impl KNearestNeighbors {
    /// Indices and distances of the `k` closest samples. Ties keep sample order.
    fn neighbors(&self, features: &ScaledFeatures) -> Vec<(usize, f64)> {
        let query = features.values();
        let mut distances: Vec<(usize, f64)> = self
            .samples
            .outer_iter()
            .enumerate()
            .map(|(index, sample)| {
                let sample = sample.to_vec();
                (index, self.metric.distance(&sample, query))
            })
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(self.k);
        distances
    }
}

impl ProbabilisticClassifier for KNearestNeighbors {
    fn name(&self) -> ModelName {
        ModelName::Knn
    }

    fn approval_probability(&self, features: &ScaledFeatures) -> f64 {
        let neighbors = self.neighbors(features);
        let positive = |index: usize| f64::from(self.labels[index]);

        match self.weights {
            NeighborWeights::Uniform => {
                let approved: f64 = neighbors.iter().map(|(index, _)| positive(*index)).sum();
                approved / neighbors.len() as f64
            }
            NeighborWeights::Distance => {
                // Exact matches decide on their own.
                let exact: Vec<usize> = neighbors
                    .iter()
                    .filter(|(_, distance)| *distance == 0.0)
                    .map(|(index, _)| *index)
                    .collect();
                if !exact.is_empty() {
                    let approved: f64 = exact.iter().map(|index| positive(*index)).sum();
                    return approved / exact.len() as f64;
                }

                let (approved, total) = neighbors.iter().fold(
                    (0.0, 0.0),
                    |(approved, total), (index, distance)| {
                        let weight = 1.0 / distance;
                        (approved + weight * positive(*index), total + weight)
                    },
                );
                approved / total
            }
        }
    }
}
