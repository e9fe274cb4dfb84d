use crate::artifacts::{ArtifactHandle, ArtifactStore};
use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::dataset::LabelledTable;
use crate::ml::model::{ChurnModel, LogisticModel, ModelArtifact, ModelMetrics, ProbabilisticModel};
use crate::ml::preprocessor::FittedTransform;
use crate::ml::schema::FeatureSchema;
use crate::models::decide;
use ndarray::Array2;
use serde::Serialize;
use smartcore::linalg::basic::arrays::Array as _;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use std::cmp::Ordering;
use tracing::info;

/// Output of one baseline training run, not yet persisted
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    pub preprocessor: FittedTransform,
    pub model: ModelArtifact,
    pub n_train: usize,
    pub n_test: usize,
}

/// Where a training run was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifacts {
    pub preprocessor: ArtifactHandle,
    pub model: ArtifactHandle,
}

fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

/// Fit a binary logistic regression on a transformed feature matrix
pub fn fit_logistic_regression(
    features: &Array2<f64>,
    labels: &[u8],
    regularization: f64,
) -> Result<LogisticModel> {
    if features.nrows() != labels.len() {
        return Err(AppError::Training(format!(
            "{} feature rows but {} labels",
            features.nrows(),
            labels.len()
        )));
    }

    let x = ndarray_to_densematrix(features);
    let y: Vec<i32> = labels.iter().map(|&l| i32::from(l)).collect();

    let params = LogisticRegressionParameters::default().with_alpha(regularization);
    let fitted: LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>> =
        LogisticRegression::fit(&x, &y, params).map_err(|e| {
            AppError::Training(format!("Failed to train logistic regression: {}", e))
        })?;

    let weights = fitted.coefficients();
    let coefficients: Vec<f64> = match weights.shape() {
        (1, cols) => (0..cols).map(|j| *weights.get((0, j))).collect(),
        (rows, 1) => (0..rows).map(|i| *weights.get((i, 0))).collect(),
        (rows, cols) => {
            return Err(AppError::Training(format!(
                "Expected binary coefficients, got a {}x{} matrix",
                rows, cols
            )))
        }
    };
    let intercept = *fitted.intercept().get((0, 0));

    if coefficients.len() != features.ncols() {
        return Err(AppError::Training(format!(
            "Solver returned {} coefficients for {} features",
            coefficients.len(),
            features.ncols()
        )));
    }
    if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
        return Err(AppError::Training(
            "Solver diverged to non-finite coefficients".to_string(),
        ));
    }

    Ok(LogisticModel::new(coefficients, intercept))
}

/// Area under the ROC curve (rank statistic, ties share their average rank).
///
/// 0.5 when only one class is present.
pub fn roc_auc(scores: &[f64], labels: &[u8]) -> f64 {
    let n_pos = labels.iter().filter(|l| **l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; the tie group [i, j] shares its mean rank
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += order[i..=j]
            .iter()
            .filter(|&&k| labels[k] == 1)
            .count() as f64
            * mean_rank;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

/// Evaluate a model on a held-out matrix using the 0.5 decision threshold
pub fn evaluate(
    model: &dyn ProbabilisticModel,
    features: &Array2<f64>,
    labels: &[u8],
) -> Result<ModelMetrics> {
    let scores = features
        .rows()
        .into_iter()
        .map(|row| model.predict_proba(row))
        .collect::<Result<Vec<f64>>>()?;

    let predictions: Vec<u8> = scores.iter().map(|&p| decide(p)).collect();
    let pairs = || labels.iter().zip(predictions.iter());

    let tp = pairs().filter(|(t, p)| **t == 1 && **p == 1).count();
    let fp = pairs().filter(|(t, p)| **t == 0 && **p == 1).count();
    let fn_count = pairs().filter(|(t, p)| **t == 1 && **p == 0).count();
    let correct = pairs().filter(|(t, p)| t == p).count();

    let n_samples = labels.len();
    let accuracy = if n_samples > 0 {
        correct as f64 / n_samples as f64
    } else {
        0.0
    };

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };

    let recall = if tp + fn_count > 0 {
        tp as f64 / (tp + fn_count) as f64
    } else {
        0.0
    };

    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ModelMetrics {
        accuracy,
        precision,
        recall,
        f1_score,
        roc_auc: roc_auc(&scores, labels),
        support: n_samples,
    })
}

/// Split, fit the preprocessor on the training half, fit one logistic regression and
/// evaluate it on the held-out half
pub fn train_baseline(
    table: &LabelledTable,
    schema: &FeatureSchema,
    config: &TrainingConfig,
) -> Result<TrainedPipeline> {
    let (train, test) = table.train_test_split(config.test_size, config.random_seed)?;

    let preprocessor = FittedTransform::fit(&train.records, schema)?;
    let x_train = preprocessor.transform(&train.records)?;
    let x_test = preprocessor.transform(&test.records)?;

    let logistic = fit_logistic_regression(&x_train, &train.labels, config.regularization)?;
    let metrics = evaluate(&logistic, &x_test, &test.labels)?;

    info!(
        n_train = train.len(),
        n_test = test.len(),
        n_features = preprocessor.n_features(),
        accuracy = metrics.accuracy,
        roc_auc = metrics.roc_auc,
        "Trained baseline model"
    );

    let model = ModelArtifact::new(
        config.model_name.clone(),
        ChurnModel::LogisticRegression(logistic),
        preprocessor.feature_names().to_vec(),
        train.len(),
    )
    .with_metrics(metrics);

    Ok(TrainedPipeline {
        preprocessor,
        model,
        n_train: train.len(),
        n_test: test.len(),
    })
}

impl TrainedPipeline {
    /// Write the preprocessor, then the model
    pub async fn publish(
        &self,
        store: &dyn ArtifactStore,
        preprocessor_name: &str,
    ) -> Result<PublishedArtifacts> {
        let preprocessor = self.preprocessor.save(store, preprocessor_name).await?;
        let model = self.model.save(store).await?;

        info!(preprocessor = %preprocessor, model = %model, "Published training artifacts");

        Ok(PublishedArtifacts {
            preprocessor,
            model,
        })
    }
}
