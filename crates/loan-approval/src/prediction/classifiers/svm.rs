use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{sigmoid, ProbabilisticClassifier};
use crate::prediction::artifact::{ensure_finite, ArtifactError};
use crate::prediction::domain::{ModelName, FEATURE_COUNT};
use crate::prediction::scaler::ScaledFeatures;

const ARTIFACT: &str = "svm";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn evaluate(self, support: ArrayView1<'_, f64>, x: &Array1<f64>) -> f64 {
        match self {
            Kernel::Linear => support.dot(x),
            Kernel::Rbf { gamma } => {
                let squared: f64 = support
                    .iter()
                    .zip(x.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (-gamma * squared).exp()
            }
            // `validate` bounds the degree to i32.
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * support.dot(x) + coef0).powi(degree as i32),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * support.dot(x) + coef0).tanh(),
        }
    }

    fn validate(self) -> Result<(), ArtifactError> {
        if let Kernel::Poly { degree, .. } = self {
            if i32::try_from(degree).is_err() {
                return Err(ArtifactError::invalid(
                    ARTIFACT,
                    format!("polynomial degree {degree} is too large"),
                ));
            }
        }
        let (gamma, coef0) = match self {
            Kernel::Linear => return Ok(()),
            Kernel::Rbf { gamma } => (gamma, 0.0),
            Kernel::Poly { gamma, coef0, .. } | Kernel::Sigmoid { gamma, coef0 } => (gamma, coef0),
        };
        if !gamma.is_finite() || gamma <= 0.0 || !coef0.is_finite() {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                "kernel gamma must be positive and coefficients finite",
            ));
        }
        Ok(())
    }
}

/// Persisted support vector classifier with Platt scaling parameters.
///
/// The decision value is oriented so that positive values favour approval, and
/// `P(approved) = 1 / (1 + exp(prob_a * f + prob_b))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmArtifact {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    pub prob_a: f64,
    pub prob_b: f64,
}

#[derive(Debug)]
pub struct SupportVectorMachine {
    kernel: Kernel,
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
    prob_a: f64,
    prob_b: f64,
}

impl TryFrom<SvmArtifact> for SupportVectorMachine {
    type Error = ArtifactError;

    fn try_from(artifact: SvmArtifact) -> Result<Self, Self::Error> {
        artifact.kernel.validate()?;

        let count = artifact.support_vectors.len();
        if count == 0 {
            return Err(ArtifactError::invalid(ARTIFACT, "no support vectors"));
        }
        if artifact.dual_coef.len() != count {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!(
                    "{} dual coefficients for {count} support vectors",
                    artifact.dual_coef.len()
                ),
            ));
        }
        if let Some(row) = artifact
            .support_vectors
            .iter()
            .position(|vector| vector.len() != FEATURE_COUNT)
        {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!("support vector {row} does not have {FEATURE_COUNT} features"),
            ));
        }

        let flat: Vec<f64> = artifact.support_vectors.into_iter().flatten().collect();
        ensure_finite(ARTIFACT, "support_vectors", &flat)?;
        ensure_finite(ARTIFACT, "dual_coef", &artifact.dual_coef)?;
        ensure_finite(
            ARTIFACT,
            "platt",
            &[artifact.intercept, artifact.prob_a, artifact.prob_b],
        )?;

        let support_vectors = Array2::from_shape_vec((count, FEATURE_COUNT), flat)
            .map_err(|err| ArtifactError::invalid(ARTIFACT, err.to_string()))?;

        Ok(Self {
            kernel: artifact.kernel,
            support_vectors,
            dual_coef: Array1::from_vec(artifact.dual_coef),
            intercept: artifact.intercept,
            prob_a: artifact.prob_a,
            prob_b: artifact.prob_b,
        })
    }
}

impl SupportVectorMachine {
    pub fn decision_value(&self, features: &ScaledFeatures) -> f64 {
        let x = Array1::from_vec(features.values().to_vec());
        let weighted: f64 = self
            .support_vectors
            .outer_iter()
            .zip(self.dual_coef.iter())
            .map(|(support, coef)| coef * self.kernel.evaluate(support, &x))
            .sum();
        weighted + self.intercept
    }
}

impl ProbabilisticClassifier for SupportVectorMachine {
    fn name(&self) -> ModelName {
        ModelName::Svm
    }

    fn approval_probability(&self, features: &ScaledFeatures) -> f64 {
        let decision = self.decision_value(features);
        sigmoid(-(self.prob_a * decision + self.prob_b))
    }
}
