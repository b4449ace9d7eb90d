//! Inference-only ports of the fitted classifiers.
//!
//! Each family is persisted as a JSON document tagged by `kind`. Loading validates the
//! parameters once so that [`ProbabilisticClassifier::approval_probability`] never has to.

mod decision_tree;
mod knn;
mod neural_network;
mod svm;

pub use decision_tree::{DecisionTree, DecisionTreeArtifact, TreeNode};
pub use knn::{DistanceMetric, KNearestNeighbors, KnnArtifact, NeighborWeights};
pub use neural_network::{Activation, DenseLayerArtifact, NeuralNetwork, NeuralNetworkArtifact};
pub use svm::{Kernel, SupportVectorMachine, SvmArtifact};

use serde::{Deserialize, Serialize};

use super::artifact::ArtifactError;
use super::domain::ModelName;
use super::scaler::ScaledFeatures;

/// Contract shared by every registered model.
pub trait ProbabilisticClassifier: Send + Sync {
    fn name(&self) -> ModelName;

    /// Probability of the positive ("approved") class for one standardized record.
    fn approval_probability(&self, features: &ScaledFeatures) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    NeuralNetwork(NeuralNetworkArtifact),
    Svm(SvmArtifact),
    DecisionTree(DecisionTreeArtifact),
    Knn(KnnArtifact),
}

impl ModelArtifact {
    pub fn model_name(&self) -> ModelName {
        match self {
            ModelArtifact::NeuralNetwork(_) => ModelName::NeuralNetwork,
            ModelArtifact::Svm(_) => ModelName::Svm,
            ModelArtifact::DecisionTree(_) => ModelName::DecisionTree,
            ModelArtifact::Knn(_) => ModelName::Knn,
        }
    }

    pub fn into_classifier(self) -> Result<Box<dyn ProbabilisticClassifier>, ArtifactError> {
        Ok(match self {
            ModelArtifact::NeuralNetwork(artifact) => Box::new(NeuralNetwork::try_from(artifact)?),
            ModelArtifact::Svm(artifact) => Box::new(SupportVectorMachine::try_from(artifact)?),
            ModelArtifact::DecisionTree(artifact) => Box::new(DecisionTree::try_from(artifact)?),
            ModelArtifact::Knn(artifact) => Box::new(KNearestNeighbors::try_from(artifact)?),
        })
    }
}

pub(crate) fn sigmoid(value: f64) -> f64 {
    if value >= 0.0 {
        1.0 / (1.0 + (-value).exp())
    } else {
        let exp = value.exp();
        exp / (1.0 + exp)
    }
}
