use crate::artifacts::{ArtifactHandle, ArtifactStore};
use crate::error::{AppError, Result};
use crate::ml::model::{ChurnModel, ModelArtifact, ModelMetadata, ProbabilisticModel};
use crate::ml::preprocessor::FittedTransform;
use crate::models::{PredictionResult, Record};
use ndarray::ArrayView1;
use rayon::prelude::*;
use tracing::{info, warn};

/// A fitted preprocessor and a trained model, checked to agree on the feature layout.
///
/// Immutable once built; `predict` and `predict_batch` can be called from any number
/// of threads.
#[derive(Debug, Clone)]
pub struct Predictor {
    preprocessor: FittedTransform,
    model: ChurnModel,
    metadata: ModelMetadata,
    model_identifier: String,
}

impl Predictor {
    /// Compose a predictor, rejecting artifacts whose layouts disagree
    pub fn new(
        preprocessor: FittedTransform,
        artifact: ModelArtifact,
        model_identifier: impl Into<String>,
    ) -> Result<Self> {
        let expected = artifact.model.n_features();
        let produced = preprocessor.n_features();

        if expected != produced {
            return Err(AppError::ArtifactCorrupt(format!(
                "Model expects {} features but the preprocessor produces {}",
                expected, produced
            )));
        }

        if artifact.metadata.feature_names != preprocessor.feature_names() {
            let drift = artifact
                .metadata
                .feature_names
                .iter()
                .zip(preprocessor.feature_names())
                .position(|(a, b)| a != b)
                .unwrap_or(0);
            return Err(AppError::ArtifactCorrupt(format!(
                "Model was trained on a different feature layout (first difference at position {})",
                drift
            )));
        }

        Ok(Self {
            preprocessor,
            model: artifact.model,
            metadata: artifact.metadata,
            model_identifier: model_identifier.into(),
        })
    }

    /// Load and cross-check both artifacts.
    ///
    /// Latest handles are pinned first so the identifier names the version actually read.
    pub async fn load(
        store: &dyn ArtifactStore,
        model: &ArtifactHandle,
        preprocessor: &ArtifactHandle,
    ) -> Result<Self> {
        let model_handle = store.resolve(model).await?;
        let preprocessor_handle = store.resolve(preprocessor).await?;

        let (artifact, fitted) = tokio::try_join!(
            ModelArtifact::load(store, &model_handle),
            FittedTransform::load(store, &preprocessor_handle),
        )?;

        let predictor = Self::new(fitted, artifact, model_handle.to_string())?;

        info!(
            model = %model_handle,
            preprocessor = %preprocessor_handle,
            n_features = predictor.n_features(),
            "Predictor loaded"
        );

        Ok(predictor)
    }

    /// Score one record
    pub fn predict<R: Record + ?Sized>(&self, record: &R) -> Result<PredictionResult> {
        let features = self.preprocessor.transform_one(record)?;
        let probability = self.model.predict_proba(ArrayView1::from(&features))?;

        if !probability.is_finite() {
            return Err(AppError::Internal(format!(
                "Model {} produced a non-finite probability",
                self.model_identifier
            )));
        }

        Ok(PredictionResult::from_probability(
            probability.clamp(0.0, 1.0),
            self.model_identifier.as_str(),
        ))
    }

    /// Score a batch in parallel.
    ///
    /// Fail-fast: if any record fails, the error of the lowest-index failing record is
    /// returned and no partial results are produced.
    pub fn predict_batch<R: Record + Sync>(&self, records: &[R]) -> Result<Vec<PredictionResult>> {
        let scored: Vec<Result<PredictionResult>> =
            records.par_iter().map(|record| self.predict(record)).collect();

        let mut results = Vec::with_capacity(scored.len());
        for (index, outcome) in scored.into_iter().enumerate() {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(index, batch_size = records.len(), error = %e, "Batch prediction failed");
                    return Err(e);
                }
            }
        }

        Ok(results)
    }

    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn preprocessor(&self) -> &FittedTransform {
        &self.preprocessor
    }

    pub fn n_features(&self) -> usize {
        self.preprocessor.n_features()
    }
}
