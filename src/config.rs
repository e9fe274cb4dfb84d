use crate::artifacts::ArtifactHandle;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Artifact storage configuration
    pub artifacts: ArtifactConfig,

    /// Predictor loading configuration
    pub serving: ServingConfig,

    /// Baseline training configuration
    #[serde(default)]
    pub training: TrainingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration with an explicit optional override file
    pub fn load_from(config_path: &str) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: RETENTION_AI__)
            .add_source(
                config::Environment::with_prefix("RETENTION_AI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Parse a TOML document layered over the embedded defaults
    pub fn from_toml(overrides: &str) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from_str(overrides, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Semantic checks the deserializer cannot express
    pub fn validate(&self) -> Result<()> {
        if self.artifacts.backend != ArtifactBackend::Memory && self.artifacts.path.is_none() {
            return Err(AppError::Configuration(format!(
                "The {:?} artifact backend requires 'artifacts.path'",
                self.artifacts.backend
            )));
        }

        crate::artifacts::validate_name(&self.serving.model_artifact)
            .and_then(|_| crate::artifacts::validate_name(&self.serving.preprocessor_artifact))
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        if !(self.training.regularization >= 0.0 && self.training.regularization.is_finite()) {
            return Err(AppError::Configuration(format!(
                "training.regularization must be a non-negative number, got {}",
                self.training.regularization
            )));
        }

        let test_size = self.training.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Configuration(format!(
                "training.test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: ArtifactBackend,

    /// Root directory (filesystem) or database path (sled)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactBackend {
    #[default]
    Filesystem,
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    /// Model artifact name
    #[serde(default = "default_model_artifact")]
    pub model_artifact: String,

    /// Preprocessor artifact name
    #[serde(default = "default_preprocessor_artifact")]
    pub preprocessor_artifact: String,

    /// Pin the model to a version instead of the latest
    pub model_version: Option<u64>,

    /// Pin the preprocessor to a version instead of the latest
    pub preprocessor_version: Option<u64>,

    /// Upper bound on loading both artifacts, in seconds (0 disables)
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,
}

impl ServingConfig {
    pub fn model_handle(&self) -> ArtifactHandle {
        ArtifactHandle {
            name: self.model_artifact.clone(),
            version: self.model_version,
        }
    }

    pub fn preprocessor_handle(&self) -> ArtifactHandle {
        ArtifactHandle {
            name: self.preprocessor_artifact.clone(),
            version: self.preprocessor_version,
        }
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        (self.load_timeout_secs > 0).then(|| Duration::from_secs(self.load_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Label column of the training table
    #[serde(default = "default_target_column")]
    pub target_column: String,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Seed of the stratified split
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// L2 penalty of the logistic regression
    #[serde(default = "default_regularization")]
    pub regularization: f64,

    /// Name the trained model is published under
    #[serde(default = "default_model_artifact")]
    pub model_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: default_target_column(),
            test_size: default_test_size(),
            random_seed: default_random_seed(),
            regularization: default_regularization(),
            model_name: default_model_artifact(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

fn default_model_artifact() -> String {
    "logistic_regression".to_string()
}

fn default_preprocessor_artifact() -> String {
    "preprocessor".to_string()
}

fn default_load_timeout() -> u64 {
    30
}

fn default_target_column() -> String {
    "Attrition".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_seed() -> u64 {
    42
}

fn default_regularization() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "retention-ai".to_string()
}

fn default_true() -> bool {
    true
}
