use anyhow::Context;
use clap::{Parser, Subcommand};
use retention_ai::artifacts::{create_artifact_store, inspect_handle, ArtifactHandle, ArtifactStore};
use retention_ai::ml::{train_baseline, FeatureSchema, FittedTransform, LabelledTable, ModelArtifact};
use retention_ai::models::EmployeeRecord;
use retention_ai::serving::{ScoringService, SharedPredictor};
use retention_ai::{telemetry, Config};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "retention-cli")]
#[command(about = "Train, score and inspect attrition-risk artifacts", long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the preprocessor and a baseline model, then publish both artifacts
    Train {
        /// Labelled HR table (CSV with a header row)
        #[arg(short, long, value_name = "CSV")]
        data: PathBuf,

        /// Fraction of rows held out for evaluation
        #[arg(short = 't', long)]
        test_size: Option<f64>,

        /// Seed of the stratified split
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Score a JSON file holding one employee object or an array of them
    Predict {
        #[arg(short, long, value_name = "JSON")]
        input: PathBuf,
    },

    /// Show stored versions and the latest artifacts' contents
    Inspect,
}

/// Report stored versions and the header of the version `handle` resolves to
async fn inspect_artifact(
    store: &dyn ArtifactStore,
    handle: &ArtifactHandle,
) -> anyhow::Result<(Value, Option<ArtifactHandle>)> {
    let versions = store.versions(&handle.name).await?;
    let mut report = json!({
        "name": handle.name,
        "requested": handle.to_string(),
        "versions": versions,
    });

    match inspect_handle(store, handle).await? {
        Some((pinned, header)) => {
            report["resolved"] = json!(pinned.to_string());
            report["header"] = serde_json::to_value(&header)?;
            Ok((report, Some(pinned)))
        }
        None => Ok((report, None)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_from(&cli.config).context("Failed to load configuration")?;
    telemetry::init_tracing(&config.observability)?;

    let store = create_artifact_store(&config.artifacts).await?;

    match cli.command {
        Commands::Train {
            data,
            test_size,
            seed,
        } => {
            if let Some(test_size) = test_size {
                config.training.test_size = test_size;
            }
            if let Some(seed) = seed {
                config.training.random_seed = seed;
            }
            config.validate()?;

            let schema = FeatureSchema::attrition();
            let table = LabelledTable::from_csv_path(&data, &config.training.target_column, &schema)
                .with_context(|| format!("Failed to load {:?}", data))?;

            let pipeline = train_baseline(&table, &schema, &config.training)?;
            let published = pipeline
                .publish(store.as_ref(), &config.serving.preprocessor_artifact)
                .await?;

            let summary = json!({
                "preprocessor": published.preprocessor.to_string(),
                "model": published.model.to_string(),
                "n_train": pipeline.n_train,
                "n_test": pipeline.n_test,
                "n_features": pipeline.preprocessor.n_features(),
                "metrics": pipeline.model.metadata.metrics,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Predict { input } => {
            config.validate()?;

            let raw = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {:?}", input))?;
            let value: Value = serde_json::from_str(&raw)?;

            let shared = Arc::new(SharedPredictor::from_config(store, &config.serving));
            let service = ScoringService::new(shared);

            let output = if value.is_array() {
                let records: Vec<EmployeeRecord> = serde_json::from_value(value)?;
                serde_json::to_value(service.predict_batch(records).await?)?
            } else {
                let record: EmployeeRecord = serde_json::from_value(value)?;
                serde_json::to_value(service.predict(&record).await?)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Inspect => {
            let serving = &config.serving;
            let (mut preprocessor, preprocessor_handle) =
                inspect_artifact(store.as_ref(), &serving.preprocessor_handle()).await?;
            let (mut model, model_handle) =
                inspect_artifact(store.as_ref(), &serving.model_handle()).await?;

            if let Some(handle) = preprocessor_handle {
                let fitted = FittedTransform::load(store.as_ref(), &handle).await?;
                preprocessor["feature_names"] = json!(fitted.feature_names());
                preprocessor["n_samples"] = json!(fitted.n_samples());
                preprocessor["fitted_at"] = json!(fitted.fitted_at());
            }

            if let Some(handle) = model_handle {
                let artifact = ModelArtifact::load(store.as_ref(), &handle).await?;
                model["metadata"] = serde_json::to_value(&artifact.metadata)?;
            }

            let report = json!({ "preprocessor": preprocessor, "model": model });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
