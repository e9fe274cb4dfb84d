use crate::artifacts::codec::{self, ArtifactKind};
use crate::artifacts::{ArtifactHandle, ArtifactStore};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A model that scores one feature vector with the probability of attrition.
///
/// Classifiers without native probabilities implement this by mapping their
/// score into `[0, 1]`.
pub trait ProbabilisticModel: Send + Sync {
    /// Input width the model was trained on
    fn n_features(&self) -> usize;

    /// Probability of the positive class
    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> Result<f64>;
}

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression: `p = sigmoid(intercept + coefficients · x)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    pub fn decision_function(&self, features: ArrayView1<'_, f64>) -> f64 {
        features
            .iter()
            .zip(&self.coefficients)
            .fold(self.intercept, |acc, (x, w)| acc + x * w)
    }
}

impl ProbabilisticModel for LogisticModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(AppError::Internal(format!(
                "Feature vector has {} values, model expects {}",
                features.len(),
                self.coefficients.len()
            )));
        }
        Ok(sigmoid(self.decision_function(features)))
    }
}

/// Every model family that can be persisted as an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnModel {
    LogisticRegression(LogisticModel),
}

impl ChurnModel {
    pub fn algorithm(&self) -> &'static str {
        match self {
            ChurnModel::LogisticRegression(_) => "logistic_regression",
        }
    }

    fn parameters_finite(&self) -> bool {
        match self {
            ChurnModel::LogisticRegression(m) => {
                m.intercept.is_finite() && m.coefficients.iter().all(|w| w.is_finite())
            }
        }
    }
}

impl ProbabilisticModel for ChurnModel {
    fn n_features(&self) -> usize {
        match self {
            ChurnModel::LogisticRegression(m) => m.n_features(),
        }
    }

    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> Result<f64> {
        match self {
            ChurnModel::LogisticRegression(m) => m.predict_proba(features),
        }
    }
}

/// Held-out evaluation of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
    pub support: usize,
}

/// Provenance of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub algorithm: String,
    pub trained_at: DateTime<Utc>,
    pub n_training_samples: usize,
    pub n_features: usize,

    /// Preprocessor output order the model was trained on
    pub feature_names: Vec<String>,

    pub metrics: Option<ModelMetrics>,
}

/// A trained model together with its metadata, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ModelMetadata,
    pub model: ChurnModel,
}

impl ModelArtifact {
    pub fn new(
        name: impl Into<String>,
        model: ChurnModel,
        feature_names: Vec<String>,
        n_training_samples: usize,
    ) -> Self {
        Self {
            metadata: ModelMetadata {
                name: name.into(),
                algorithm: model.algorithm().to_string(),
                trained_at: Utc::now(),
                n_training_samples,
                n_features: model.n_features(),
                feature_names,
                metrics: None,
            },
            model,
        }
    }

    pub fn with_metrics(mut self, metrics: ModelMetrics) -> Self {
        self.metadata.metrics = Some(metrics);
        self
    }

    fn check_invariants(&self) -> Result<()> {
        let width = self.model.n_features();

        if width == 0 {
            return Err(AppError::ArtifactCorrupt(
                "Model has no input features".to_string(),
            ));
        }
        if self.metadata.n_features != width || self.metadata.feature_names.len() != width {
            return Err(AppError::ArtifactCorrupt(format!(
                "Model width {} disagrees with metadata ({} declared, {} feature names)",
                width,
                self.metadata.n_features,
                self.metadata.feature_names.len()
            )));
        }
        if !self.model.parameters_finite() {
            return Err(AppError::ArtifactCorrupt(
                "Model parameters contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(ArtifactKind::Model, self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = codec::decode(ArtifactKind::Model, bytes)?;
        artifact.check_invariants()?;
        Ok(artifact)
    }

    /// Persist under the model's name, returning the pinned handle of the new version
    pub async fn save(&self, store: &dyn ArtifactStore) -> Result<ArtifactHandle> {
        let bytes = self.to_bytes()?;
        let handle = store.write(&self.metadata.name, bytes).await?;
        info!(
            artifact = %handle,
            algorithm = %self.metadata.algorithm,
            n_features = self.metadata.n_features,
            "Saved model"
        );
        Ok(handle)
    }

    pub async fn load(store: &dyn ArtifactStore, handle: &ArtifactHandle) -> Result<Self> {
        let bytes = store.read(handle).await?;
        let artifact = Self::from_bytes(&bytes)?;
        debug!(artifact = %handle, algorithm = %artifact.metadata.algorithm, "Loaded model");
        Ok(artifact)
    }
}
