//! Loan approval prediction: request validation, standardization, classifier
//! inference, and the HTTP surface that ties them together.
//!
//! The scaler and every classifier are loaded once into a [`PredictionService`] and shared
//! read-only between requests.

pub(crate) mod artifact;
pub mod classifiers;
pub mod domain;
pub mod evaluation;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod scaler;
pub mod service;

#[cfg(test)]
mod tests;

pub use artifact::ArtifactError;
pub use classifiers::{ModelArtifact, ProbabilisticClassifier};
pub use domain::{
    Decision, Dependents, Feature, FeatureVector, LoanApplication, ModelName, PredictionResult,
    PropertyArea, FEATURE_COUNT,
};
pub use evaluation::{
    evaluate, load_dataset, read_dataset, ConfusionMatrix, EvaluationError, EvaluationReport,
    LabeledApplication, ModelEvaluation,
};
pub use registry::ModelRegistry;
pub use request::{LoanApplicationRequest, PredictRequest, ValidationError};
pub use response::PredictResponse;
pub use router::prediction_router;
pub use scaler::{ScaledFeatures, ScalerArtifact, StandardScaler};
pub use service::{PredictionError, PredictionService, INVALID_MODEL_MESSAGE};
