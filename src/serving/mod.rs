//! Serving boundary: one lazily loaded predictor per process, shared by every caller.

use crate::artifacts::{ArtifactHandle, ArtifactStore};
use crate::config::ServingConfig;
use crate::error::{AppError, Result};
use crate::metrics::{
    ARTIFACT_LOADS_TOTAL, ARTIFACT_LOAD_DURATION_SECONDS, PREDICTIONS_TOTAL,
    PREDICTION_DURATION_SECONDS, PREDICTION_ERRORS_TOTAL, PREDICTOR_FEATURES,
};
use crate::ml::Predictor;
use crate::models::{EmployeeRecord, PredictionResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};
use validator::Validate;

/// Loads the predictor on first use and hands out the same instance afterwards.
///
/// Concurrent first callers wait on a single load. A failed or timed-out load leaves
/// the cell empty, so the next call tries again.
pub struct SharedPredictor {
    store: Arc<dyn ArtifactStore>,
    model: ArtifactHandle,
    preprocessor: ArtifactHandle,
    load_timeout: Option<Duration>,
    cell: OnceCell<Arc<Predictor>>,
}

impl SharedPredictor {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        model: ArtifactHandle,
        preprocessor: ArtifactHandle,
    ) -> Self {
        Self {
            store,
            model,
            preprocessor,
            load_timeout: None,
            cell: OnceCell::new(),
        }
    }

    pub fn from_config(store: Arc<dyn ArtifactStore>, config: &ServingConfig) -> Self {
        Self::new(store, config.model_handle(), config.preprocessor_handle())
            .with_load_timeout(config.load_timeout())
    }

    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// The shared predictor, loading it if this is the first call
    pub async fn get(&self) -> Result<Arc<Predictor>> {
        if let Some(predictor) = self.cell.get() {
            return Ok(predictor.clone());
        }

        self.cell.get_or_try_init(|| self.load()).await.cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    #[instrument(skip(self), fields(model = %self.model, preprocessor = %self.preprocessor))]
    async fn load(&self) -> Result<Arc<Predictor>> {
        let start = Instant::now();
        let loading = Predictor::load(self.store.as_ref(), &self.model, &self.preprocessor);

        let outcome = match self.load_timeout {
            Some(limit) => match tokio::time::timeout(limit, loading).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "Loading {} and {} exceeded {:?}",
                    self.model, self.preprocessor, limit
                ))),
            },
            None => loading.await,
        };

        let elapsed = start.elapsed();
        ARTIFACT_LOAD_DURATION_SECONDS.observe(elapsed.as_secs_f64());

        match outcome {
            Ok(predictor) => {
                ARTIFACT_LOADS_TOTAL.with_label_values(&["success"]).inc();
                PREDICTOR_FEATURES.set(predictor.n_features() as i64);
                info!(
                    model_identifier = %predictor.model_identifier(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Shared predictor ready"
                );
                Ok(Arc::new(predictor))
            }
            Err(e) => {
                let outcome = if matches!(e, AppError::Timeout(_)) {
                    "timeout"
                } else {
                    "error"
                };
                ARTIFACT_LOADS_TOTAL.with_label_values(&[outcome]).inc();
                error!(error = %e, code = e.error_code(), "Failed to load predictor");
                Err(e)
            }
        }
    }
}

/// Validates boundary records, scores them with the shared predictor and records metrics
#[derive(Clone)]
pub struct ScoringService {
    predictor: Arc<SharedPredictor>,
}

impl ScoringService {
    pub fn new(predictor: Arc<SharedPredictor>) -> Self {
        Self { predictor }
    }

    pub fn shared_predictor(&self) -> &Arc<SharedPredictor> {
        &self.predictor
    }

    pub async fn predict(&self, record: &EmployeeRecord) -> Result<PredictionResult> {
        let timer = PREDICTION_DURATION_SECONDS.start_timer();

        let outcome = match record.validate() {
            Ok(()) => match self.predictor.get().await {
                Ok(predictor) => predictor.predict(record),
                Err(e) => Err(e),
            },
            Err(e) => Err(AppError::from(e)),
        };

        timer.observe_duration();
        Self::record(&outcome);
        if let Ok(result) = &outcome {
            PREDICTIONS_TOTAL
                .with_label_values(&[result.risk_level.as_label()])
                .inc();
        }
        outcome
    }

    /// Score a batch on the blocking pool; fails on the first invalid record
    pub async fn predict_batch(&self, records: Vec<EmployeeRecord>) -> Result<Vec<PredictionResult>> {
        let timer = PREDICTION_DURATION_SECONDS.start_timer();
        let outcome = self.score_batch(records).await;
        timer.observe_duration();

        Self::record(&outcome);
        if let Ok(results) = &outcome {
            for result in results {
                PREDICTIONS_TOTAL
                    .with_label_values(&[result.risk_level.as_label()])
                    .inc();
            }
        }
        outcome
    }

    async fn score_batch(&self, records: Vec<EmployeeRecord>) -> Result<Vec<PredictionResult>> {
        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(|e| {
                AppError::Validation(format!("Record {}: {}", index, e))
            })?;
        }

        let predictor = self.predictor.get().await?;

        tokio::task::spawn_blocking(move || predictor.predict_batch(&records))
            .await
            .map_err(|e| AppError::Internal(format!("Batch scoring task failed: {}", e)))?
    }

    fn record<T>(outcome: &Result<T>) {
        if let Err(e) = outcome {
            PREDICTION_ERRORS_TOTAL
                .with_label_values(&[e.error_code()])
                .inc();
        }
    }
}
