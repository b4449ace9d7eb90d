use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::prediction::ModelName;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub artifacts: ArtifactConfig,
    pub serving: ServingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let artifact_dir = env::var("APP_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("artifacts"));

        let default_model = match env::var("APP_DEFAULT_MODEL") {
            Ok(raw) => raw
                .trim()
                .parse::<ModelName>()
                .map_err(|_| ConfigError::InvalidModel(raw))?,
            Err(_) => ServingConfig::default().default_model,
        };

        let default_threshold = threshold_var(
            "APP_DECISION_THRESHOLD",
            ServingConfig::DEFAULT_THRESHOLD,
        )?;
        let simple_threshold =
            threshold_var("APP_SIMPLE_THRESHOLD", ServingConfig::SIMPLE_THRESHOLD)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            artifacts: ArtifactConfig { dir: artifact_dir },
            serving: ServingConfig {
                default_model,
                default_threshold,
                simple_threshold,
            },
        })
    }
}

fn threshold_var(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(ConfigError::InvalidThreshold { name, value: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the persisted scaler and classifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
}

impl ArtifactConfig {
    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join("scaler.json")
    }
}

/// Model selection and decision thresholds applied to prediction requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServingConfig {
    /// Model used when a request does not name one.
    pub default_model: ModelName,
    /// Threshold for requests that select a model without overriding it.
    pub default_threshold: f64,
    /// Threshold for requests that do not select a model.
    pub simple_threshold: f64,
}

impl ServingConfig {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;
    pub const SIMPLE_THRESHOLD: f64 = 0.4;
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            default_model: ModelName::NeuralNetwork,
            default_threshold: Self::DEFAULT_THRESHOLD,
            simple_threshold: Self::SIMPLE_THRESHOLD,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidModel(String),
    InvalidThreshold { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidModel(value) => write!(
                f,
                "APP_DEFAULT_MODEL '{}' must be one of neural_network, svm, decision_tree, knn",
                value
            ),
            ConfigError::InvalidThreshold { name, value } => {
                write!(f, "{} '{}' must be a number between 0 and 1", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidModel(_)
            | ConfigError::InvalidThreshold { .. } => None,
        }
    }
}
