use anyhow::Context;
use retention_ai::artifacts::create_artifact_store;
use retention_ai::models::{EmployeeRecord, PredictionResult};
use retention_ai::serving::{ScoringService, SharedPredictor};
use retention_ai::{metrics, telemetry, AppError, Config};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

fn error_body(error: &AppError) -> Value {
    json!({
        "error": {
            "code": error.error_code(),
            "message": error.to_string(),
            "retryable": error.is_retryable(),
        }
    })
}

fn encode<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| error_body(&AppError::from(e)))
}

/// Score one input line: an object is one record, an array is a batch
async fn handle_line(service: &ScoringService, line: &str) -> Value {
    let input: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return error_body(&AppError::Validation(format!("Invalid JSON: {}", e))),
    };

    if input.is_array() {
        let records: Vec<EmployeeRecord> = match serde_json::from_value(input) {
            Ok(records) => records,
            Err(e) => return error_body(&AppError::Validation(format!("Invalid records: {}", e))),
        };
        return match service.predict_batch(records).await {
            Ok(results) => encode::<Vec<PredictionResult>>(&results),
            Err(e) => error_body(&e),
        };
    }

    let record: EmployeeRecord = match serde_json::from_value(input) {
        Ok(record) => record,
        Err(e) => return error_body(&AppError::Validation(format!("Invalid record: {}", e))),
    };

    match service.predict(&record).await {
        Ok(result) => encode(&result),
        Err(e) => error_body(&e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize tracing
    telemetry::init_tracing(&config.observability)?;
    config.validate()?;

    info!(service = %config.observability.service_name, "Starting scoring process");

    if config.observability.prometheus_enabled {
        metrics::init_metrics().context("Failed to register metrics")?;
    }

    let store = create_artifact_store(&config.artifacts).await?;
    let shared = Arc::new(SharedPredictor::from_config(store, &config.serving));
    let service = ScoringService::new(shared.clone());

    // Warm the predictor; a failed load is retried on the first request
    match shared.get().await {
        Ok(predictor) => info!(
            model_identifier = %predictor.model_identifier(),
            "Ready to score records from stdin"
        ),
        Err(e) => warn!(error = %e, "Predictor not loaded yet, will retry on first request"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut scored = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let mut output = handle_line(&service, &line).await.to_string();
        output.push('\n');
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
        scored += 1;
    }

    info!(lines = scored, "Input closed, shutting down");

    if config.observability.prometheus_enabled {
        debug!("Final metrics:\n{}", metrics::gather_metrics());
    }

    Ok(())
}
