mod common;

use common::{
    logistic_artifact, publish_zero_model, sample_employee, small_schema, small_table,
    CountingStore,
};
use retention_ai::artifacts::{ArtifactHandle, ArtifactStore, InMemoryArtifactStore};
use retention_ai::ml::{FittedTransform, Predictor};
use retention_ai::models::{RawRecord, RiskLevel};
use retention_ai::serving::{ScoringService, SharedPredictor};
use retention_ai::AppError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_load_and_predict_half_probability() {
    let store = InMemoryArtifactStore::new();
    let (model, preprocessor) = publish_zero_model(&store).await;

    let predictor = Predictor::load(&store, &model, &preprocessor).await.unwrap();
    let result = predictor
        .predict(&RawRecord::new().with("Age", 41i64).with("Department", "Sales"))
        .unwrap();

    assert_eq!(result.churn_probability, 0.5);
    assert_eq!(result.prediction, 1);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(result.model_identifier, "logistic_regression@v1");
}

#[tokio::test]
async fn test_latest_handle_reports_resolved_version() {
    let store = InMemoryArtifactStore::new();
    publish_zero_model(&store).await;
    publish_zero_model(&store).await;

    let predictor = Predictor::load(
        &store,
        &ArtifactHandle::latest("logistic_regression"),
        &ArtifactHandle::latest("preprocessor"),
    )
    .await
    .unwrap();

    assert_eq!(predictor.model_identifier(), "logistic_regression@v2");
}

#[tokio::test]
async fn test_missing_artifacts() {
    let store = InMemoryArtifactStore::new();

    let result = Predictor::load(
        &store,
        &ArtifactHandle::latest("logistic_regression"),
        &ArtifactHandle::latest("preprocessor"),
    )
    .await;
    assert!(matches!(result, Err(AppError::ArtifactMissing(_))));

    let (model, _) = publish_zero_model(&store).await;
    let result = Predictor::load(&store, &model, &ArtifactHandle::pinned("preprocessor", 9)).await;
    assert!(matches!(result, Err(AppError::ArtifactMissing(_))));
}

#[tokio::test]
async fn test_width_mismatch_between_artifacts() {
    let store = InMemoryArtifactStore::new();
    let fitted = FittedTransform::fit(&small_table(), &small_schema()).unwrap();
    let preprocessor = fitted.save(&store, "preprocessor").await.unwrap();

    // Model trained on a narrower layout
    let narrow_rows = vec![
        RawRecord::new().with("Age", 30i64).with("Department", "Sales"),
        RawRecord::new().with("Age", 40i64).with("Department", "HR"),
    ];
    let narrow = FittedTransform::fit(&narrow_rows, &small_schema()).unwrap();
    let model = logistic_artifact("logistic_regression", &narrow, vec![0.1, 0.2, 0.3], 0.0)
        .save(&store)
        .await
        .unwrap();

    assert!(matches!(
        Predictor::load(&store, &model, &preprocessor).await,
        Err(AppError::ArtifactCorrupt(_))
    ));
}

#[tokio::test]
async fn test_model_blob_under_preprocessor_name_is_corrupt() {
    let store = InMemoryArtifactStore::new();
    let (model, _) = publish_zero_model(&store).await;

    let model_bytes = store.read(&model).await.unwrap();
    let preprocessor = store.write("preprocessor", model_bytes).await.unwrap();

    assert!(matches!(
        Predictor::load(&store, &model, &preprocessor).await,
        Err(AppError::ArtifactCorrupt(_))
    ));
}

#[tokio::test]
async fn test_missing_required_field_is_schema_mismatch() {
    let store = InMemoryArtifactStore::new();
    let (model, preprocessor) = publish_zero_model(&store).await;
    let predictor = Predictor::load(&store, &model, &preprocessor).await.unwrap();

    match predictor.predict(&RawRecord::new().with("Department", "Sales")) {
        Err(AppError::SchemaMismatch { column, .. }) => assert_eq!(column, "Age"),
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_load_once() {
    let store = Arc::new(CountingStore::with_delay(Duration::from_millis(50)));
    let (model, preprocessor) = publish_zero_model(&*store).await;

    let shared = Arc::new(SharedPredictor::new(store.clone(), model, preprocessor));
    assert!(!shared.is_loaded());

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let shared = shared.clone();
        tasks.push(tokio::spawn(async move { shared.get().await.unwrap() }));
    }

    let mut predictors = Vec::new();
    for task in tasks {
        predictors.push(task.await.unwrap());
    }

    // One load reads exactly two artifacts
    assert_eq!(store.reads(), 2);
    assert!(shared.is_loaded());
    assert!(predictors.iter().all(|p| Arc::ptr_eq(p, &predictors[0])));

    shared.get().await.unwrap();
    assert_eq!(store.reads(), 2);
}

#[tokio::test]
async fn test_failed_load_is_retried() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let shared = SharedPredictor::new(
        store.clone(),
        ArtifactHandle::latest("logistic_regression"),
        ArtifactHandle::latest("preprocessor"),
    );

    let first = shared.get().await;
    assert!(matches!(first, Err(AppError::ArtifactMissing(_))));
    assert!(first.unwrap_err().is_retryable());
    assert!(!shared.is_loaded());

    publish_zero_model(&*store).await;
    assert!(shared.get().await.is_ok());
}

#[tokio::test]
async fn test_load_timeout() {
    let store = Arc::new(CountingStore::with_delay(Duration::from_millis(500)));
    let (model, preprocessor) = publish_zero_model(&*store).await;

    let shared = SharedPredictor::new(store, model, preprocessor)
        .with_load_timeout(Some(Duration::from_millis(20)));

    let result = shared.get().await;
    assert!(matches!(result, Err(AppError::Timeout(_))));
    assert!(!shared.is_loaded());
}

#[tokio::test]
async fn test_scoring_service_validates_boundary_records() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let (model, preprocessor) = publish_zero_model(&*store).await;
    let service = ScoringService::new(Arc::new(SharedPredictor::new(store, model, preprocessor)));

    let valid = sample_employee();
    let result = service.predict(&valid).await.unwrap();
    assert_eq!(result.risk_level, RiskLevel::High);

    let mut invalid = sample_employee();
    invalid.job_satisfaction = 9;
    assert!(matches!(
        service.predict(&invalid).await,
        Err(AppError::Validation(_))
    ));

    let batch = service
        .predict_batch(vec![valid.clone(), valid.clone(), valid])
        .await
        .unwrap();
    assert_eq!(batch.len(), 3);

    match service.predict_batch(vec![sample_employee(), invalid]).await {
        Err(AppError::Validation(msg)) => assert!(msg.starts_with("Record 1")),
        other => panic!("expected Validation, got {:?}", other),
    }
}
