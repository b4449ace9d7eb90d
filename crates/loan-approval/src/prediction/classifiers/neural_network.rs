use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{sigmoid, ProbabilisticClassifier};
use crate::prediction::artifact::{ensure_finite, ArtifactError};
use crate::prediction::domain::{ModelName, FEATURE_COUNT};
use crate::prediction::scaler::ScaledFeatures;

const ARTIFACT: &str = "neural_network";

/// Hidden-layer activation. The single output unit is always logistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    fn apply(self, value: f64) -> f64 {
        match self {
            Activation::Relu => value.max(0.0),
            Activation::Tanh => value.tanh(),
            Activation::Logistic => sigmoid(value),
            Activation::Identity => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerArtifact {
    /// One row per output unit, one column per input.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetworkArtifact {
    #[serde(default)]
    pub activation: Activation,
    pub layers: Vec<DenseLayerArtifact>,
}

#[derive(Debug)]
struct DenseLayer {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

/// Fully connected feed-forward network with a logistic output unit.
#[derive(Debug)]
pub struct NeuralNetwork {
    activation: Activation,
    layers: Vec<DenseLayer>,
}

impl TryFrom<NeuralNetworkArtifact> for NeuralNetwork {
    type Error = ArtifactError;

    fn try_from(artifact: NeuralNetworkArtifact) -> Result<Self, Self::Error> {
        if artifact.layers.is_empty() {
            return Err(ArtifactError::invalid(ARTIFACT, "at least one layer is required"));
        }

        let mut inputs = FEATURE_COUNT;
        let mut layers = Vec::with_capacity(artifact.layers.len());
        for (position, layer) in artifact.layers.into_iter().enumerate() {
            let dense = dense_layer(position, layer, inputs)?;
            inputs = dense.biases.len();
            layers.push(dense);
        }

        if inputs != 1 {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!("output layer must have a single unit, found {inputs}"),
            ));
        }

        Ok(Self {
            activation: artifact.activation,
            layers,
        })
    }
}

fn dense_layer(
    position: usize,
    layer: DenseLayerArtifact,
    inputs: usize,
) -> Result<DenseLayer, ArtifactError> {
    let outputs = layer.biases.len();
    if outputs == 0 || layer.weights.len() != outputs {
        return Err(ArtifactError::invalid(
            ARTIFACT,
            format!(
                "layer {position} has {} weight rows for {outputs} biases",
                layer.weights.len()
            ),
        ));
    }
    if let Some(row) = layer.weights.iter().position(|row| row.len() != inputs) {
        return Err(ArtifactError::invalid(
            ARTIFACT,
            format!("layer {position} row {row} does not have {inputs} inputs"),
        ));
    }

    let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
    ensure_finite(ARTIFACT, "weights", &flat)?;
    ensure_finite(ARTIFACT, "biases", &layer.biases)?;

    let weights = Array2::from_shape_vec((outputs, inputs), flat)
        .map_err(|err| ArtifactError::invalid(ARTIFACT, err.to_string()))?;

    Ok(DenseLayer {
        weights,
        biases: Array1::from_vec(layer.biases),
    })
}

impl NeuralNetwork {
    fn output_logit(&self, features: &ScaledFeatures) -> f64 {
        let mut activations = Array1::from_vec(features.values().to_vec());
        let last = self.layers.len() - 1;
        for (position, layer) in self.layers.iter().enumerate() {
            let mut next = layer.weights.dot(&activations) + &layer.biases;
            if position != last {
                next.mapv_inplace(|value| self.activation.apply(value));
            }
            activations = next;
        }
        activations[0]
    }
}

impl ProbabilisticClassifier for NeuralNetwork {
    fn name(&self) -> ModelName {
        ModelName::NeuralNetwork
    }

    fn approval_probability(&self, features: &ScaledFeatures) -> f64 {
        sigmoid(self.output_logit(features))
    }
}
