use tracing::debug;

use super::artifact::ArtifactError;
use super::domain::{Decision, LoanApplication, ModelName, PredictionResult};
use super::registry::ModelRegistry;
use super::request::{validate_threshold, PredictRequest, ValidationError};
use super::response::PredictResponse;
use super::scaler::StandardScaler;
use crate::config::{ArtifactConfig, ServingConfig};

/// Message returned when a request selects a model that is not registered.
pub const INVALID_MODEL_MESSAGE: &str = "Invalid model selected";

/// Read-only facade over the scaler and classifiers, shared by every request.
#[derive(Debug)]
pub struct PredictionService {
    scaler: StandardScaler,
    registry: ModelRegistry,
    settings: ServingConfig,
}

impl PredictionService {
    pub fn new(
        scaler: StandardScaler,
        registry: ModelRegistry,
        settings: ServingConfig,
    ) -> Result<Self, ArtifactError> {
        if !registry.contains(settings.default_model) {
            return Err(ArtifactError::MissingDefault(settings.default_model.as_str()));
        }
        Ok(Self {
            scaler,
            registry,
            settings,
        })
    }

    /// Loads the scaler and every classifier eagerly so a broken deployment fails at startup.
    pub fn from_artifacts(
        artifacts: &ArtifactConfig,
        settings: ServingConfig,
    ) -> Result<Self, ArtifactError> {
        let scaler = StandardScaler::load(&artifacts.scaler_path())?;
        let registry = ModelRegistry::load(&artifacts.dir)?;
        Self::new(scaler, registry, settings)
    }

    pub fn settings(&self) -> &ServingConfig {
        &self.settings
    }

    pub fn models(&self) -> Vec<ModelName> {
        self.registry.names()
    }

    pub fn predict(
        &self,
        application: &LoanApplication,
        model: ModelName,
        threshold: Option<f64>,
    ) -> Result<PredictionResult, PredictionError> {
        let threshold =
            validate_threshold(threshold)?.unwrap_or(self.settings.default_threshold);
        let classifier = self
            .registry
            .get(model)
            .ok_or_else(|| PredictionError::InvalidSelection(model.as_str().to_string()))?;

        let scaled = self.scaler.transform(&application.to_features());
        let probability = classifier.approval_probability(&scaled);
        if !probability.is_finite() {
            return Err(PredictionError::Inference {
                model,
                reason: format!("classifier produced {probability}"),
            });
        }
        let probability = probability.clamp(0.0, 1.0);
        let decision = Decision::from_probability(probability, threshold);

        debug!(
            model = %model,
            probability,
            threshold,
            decision = decision.label(),
            "prediction computed"
        );

        Ok(PredictionResult {
            model,
            probability,
            threshold,
            decision,
        })
    }

    pub fn predict_by_name(
        &self,
        application: &LoanApplication,
        model: &str,
        threshold: Option<f64>,
    ) -> Result<PredictionResult, PredictionError> {
        let model = model
            .trim()
            .parse::<ModelName>()
            .map_err(|err| PredictionError::InvalidSelection(err.0))?;
        self.predict(application, model, threshold)
    }

    /// Single-model contract: configured default model and the simple threshold.
    pub fn predict_simple(
        &self,
        application: &LoanApplication,
        threshold: Option<f64>,
    ) -> Result<PredictionResult, PredictionError> {
        let threshold = validate_threshold(threshold)?.unwrap_or(self.settings.simple_threshold);
        self.predict(application, self.settings.default_model, Some(threshold))
    }

    /// Validates a wire request and answers it in the shape its variant expects.
    pub fn handle(&self, request: &PredictRequest) -> Result<PredictResponse, PredictionError> {
        let application = request.application.validate()?;
        match request.model.as_deref() {
            Some(model) => self
                .predict_by_name(&application, model, request.threshold)
                .map(|result| PredictResponse::model_decision(&result)),
            None => self
                .predict_simple(&application, request.threshold)
                .map(|result| PredictResponse::loan_status(&result)),
        }
    }
}

/// Request-level failures; none of them are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid model selected: '{0}'")]
    InvalidSelection(String),
    #[error("model '{model}' failed to produce a probability: {reason}")]
    Inference { model: ModelName, reason: String },
}
