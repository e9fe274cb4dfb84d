use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Transform attempted on a preprocessor that was never fitted or loaded
    #[error("Preprocessor is not fitted")]
    NotFitted,

    /// Requested artifact handle does not resolve in the store
    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    /// Artifact bytes could not be decoded, failed integrity checks, or do not fit together
    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// A record lacks, or carries an unusable value for, a column the fitted transform requires
    #[error("Schema mismatch on column '{column}': {reason}")]
    SchemaMismatch { column: String, reason: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Artifact storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Model training errors
    #[error("Training error: {0}")]
    Training(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn schema_mismatch(column: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::SchemaMismatch {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::NotFitted => "NOT_FITTED",
            AppError::ArtifactMissing(_) => "ARTIFACT_MISSING",
            AppError::ArtifactCorrupt(_) => "ARTIFACT_CORRUPT",
            AppError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Training(_) => "TRAINING_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may sensibly retry the failed operation.
    ///
    /// Only store-side conditions qualify. `NotFitted`, `ArtifactCorrupt` and
    /// `SchemaMismatch` are programming or data errors and retrying cannot fix them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ArtifactMissing(_)
                | AppError::Storage(_)
                | AppError::Timeout(_)
                | AppError::Io(_)
        )
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Validation(format!("Invalid training table: {}", err))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
