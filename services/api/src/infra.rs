use crate::cli::ArtifactArgs;
use loan_approval::config::AppConfig;
use loan_approval::error::AppError;
use loan_approval::prediction::PredictionService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Environment configuration with the artifact directory flag applied on top.
pub(crate) fn load_config(artifacts: ArtifactArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(dir) = artifacts.artifact_dir {
        config.artifacts.dir = dir;
    }
    Ok(config)
}

/// Loads the scaler and every classifier; any failure here is fatal to the caller.
pub(crate) fn load_service(config: &AppConfig) -> Result<PredictionService, AppError> {
    let service = PredictionService::from_artifacts(&config.artifacts, config.serving)?;
    info!(
        artifact_dir = %config.artifacts.dir.display(),
        models = ?service.models(),
        default_model = %config.serving.default_model,
        "prediction artifacts loaded"
    );
    Ok(service)
}
