use crate::artifacts::codec::{self, ArtifactKind};
use crate::artifacts::{ArtifactHandle, ArtifactStore};
use crate::error::{AppError, Result};
use crate::ml::schema::FeatureSchema;
use crate::models::Record;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Standardization parameters of one numerical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

impl NumericScaler {
    /// Population mean and standard deviation; a zero deviation scales by 1
    fn fit(column: &str, values: &[f64]) -> Result<Self> {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = variance.sqrt();

        if !mean.is_finite() || !std.is_finite() {
            return Err(AppError::Validation(format!(
                "Column '{}' statistics overflow (mean {}, std {})",
                column, mean, std
            )));
        }

        Ok(Self {
            column: column.to_string(),
            mean,
            scale: if std == 0.0 { 1.0 } else { std },
        })
    }

    #[inline]
    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Fixed vocabulary of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    pub column: String,
    pub categories: Vec<String>,
}

impl CategoricalEncoder {
    fn position(&self, key: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == key)
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }
}

/// Learned state of the preprocessor.
///
/// Feature layout: one standardized value per numerical column in schema order,
/// then one one-hot block per categorical column in schema order, each block in
/// vocabulary order. The layout never changes after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    schema: FeatureSchema,
    scalers: Vec<NumericScaler>,
    encoders: Vec<CategoricalEncoder>,
    feature_names: Vec<String>,
    n_samples: usize,
    fitted_at: DateTime<Utc>,
}

fn numeric_value<R: Record + ?Sized>(record: &R, column: &str) -> Result<f64> {
    let value = record
        .field(column)
        .ok_or_else(|| AppError::schema_mismatch(column, "required numerical column is missing"))?;

    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(AppError::schema_mismatch(
            column,
            format!("numerical value {} is not finite", v),
        )),
        None => Err(AppError::schema_mismatch(
            column,
            "expected a number, found text",
        )),
    }
}

fn build_feature_names(scalers: &[NumericScaler], encoders: &[CategoricalEncoder]) -> Vec<String> {
    scalers
        .iter()
        .map(|s| format!("num__{}", s.column))
        .chain(encoders.iter().flat_map(|e| {
            e.categories
                .iter()
                .map(move |c| format!("cat__{}_{}", e.column, c))
        }))
        .collect()
}

impl FittedTransform {
    /// Fit standardization and one-hot vocabularies on a training table.
    ///
    /// Only schema columns that appear in at least one row are used. Every row must
    /// then carry a numeric value for each used numerical column. Vocabularies keep
    /// first-seen order.
    pub fn fit<R: Record>(rows: &[R], schema: &FeatureSchema) -> Result<Self> {
        schema.validate()?;

        if rows.is_empty() {
            return Err(AppError::Validation(
                "Cannot fit a preprocessor on an empty table".to_string(),
            ));
        }

        let mut scalers = Vec::new();
        for column in schema.numerical() {
            if !rows.iter().any(|r| r.field(column).is_some()) {
                debug!(column = %column, "Numerical column absent from training table, skipping");
                continue;
            }

            let values = rows
                .iter()
                .map(|r| numeric_value(r, column))
                .collect::<Result<Vec<f64>>>()?;

            scalers.push(NumericScaler::fit(column, &values)?);
        }

        let mut encoders = Vec::new();
        for column in schema.categorical() {
            let mut seen = HashSet::new();
            let mut categories = Vec::new();

            for row in rows {
                if let Some(value) = row.field(column) {
                    let key = value.category_key();
                    if seen.insert(key.to_string()) {
                        categories.push(key.into_owned());
                    }
                }
            }

            if categories.is_empty() {
                debug!(column = %column, "Categorical column absent from training table, skipping");
                continue;
            }

            encoders.push(CategoricalEncoder {
                column: column.clone(),
                categories,
            });
        }

        if scalers.is_empty() && encoders.is_empty() {
            return Err(AppError::Validation(
                "Training table contains none of the schema's feature columns".to_string(),
            ));
        }

        let feature_names = build_feature_names(&scalers, &encoders);

        info!(
            n_samples = rows.len(),
            numerical = scalers.len(),
            categorical = encoders.len(),
            n_features = feature_names.len(),
            "Fitted preprocessor"
        );

        Ok(Self {
            schema: schema.clone(),
            scalers,
            encoders,
            feature_names,
            n_samples: rows.len(),
            fitted_at: Utc::now(),
        })
    }

    fn fill<R: Record + ?Sized>(&self, record: &R, out: &mut [f64]) -> Result<()> {
        for (slot, scaler) in out.iter_mut().zip(&self.scalers) {
            *slot = scaler.apply(numeric_value(record, &scaler.column)?);
        }

        let mut offset = self.scalers.len();
        for encoder in &self.encoders {
            // Missing or unseen values leave the block all-zero
            if let Some(value) = record.field(&encoder.column) {
                if let Some(position) = encoder.position(&value.category_key()) {
                    out[offset + position] = 1.0;
                }
            }
            offset += encoder.width();
        }

        Ok(())
    }

    /// Transform a single record into a feature vector
    pub fn transform_one<R: Record + ?Sized>(&self, record: &R) -> Result<Vec<f64>> {
        let mut features = vec![0.0; self.n_features()];
        self.fill(record, &mut features)?;
        Ok(features)
    }

    /// Transform a batch of records into a `rows × features` matrix
    pub fn transform<R: Record>(&self, records: &[R]) -> Result<Array2<f64>> {
        let width = self.n_features();
        let mut data = vec![0.0; records.len() * width];

        for (chunk, record) in data.chunks_mut(width).zip(records) {
            self.fill(record, chunk)?;
        }

        Array2::from_shape_vec((records.len(), width), data)
            .map_err(|e| AppError::Internal(format!("Failed to shape feature matrix: {}", e)))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scalers(&self) -> &[NumericScaler] {
        &self.scalers
    }

    pub fn encoders(&self) -> &[CategoricalEncoder] {
        &self.encoders
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// Structural checks applied to every decoded transform
    fn check_invariants(&self) -> Result<()> {
        self.schema
            .validate()
            .map_err(|e| AppError::ArtifactCorrupt(format!("Invalid stored schema: {}", e)))?;

        if self.feature_names.is_empty() {
            return Err(AppError::ArtifactCorrupt(
                "Preprocessor produces no features".to_string(),
            ));
        }

        for scaler in &self.scalers {
            if !self.schema.numerical().contains(&scaler.column) {
                return Err(AppError::ArtifactCorrupt(format!(
                    "Scaler column '{}' is not numerical in the stored schema",
                    scaler.column
                )));
            }
            if !scaler.mean.is_finite() || !scaler.scale.is_finite() || scaler.scale <= 0.0 {
                return Err(AppError::ArtifactCorrupt(format!(
                    "Invalid scaling parameters for column '{}'",
                    scaler.column
                )));
            }
        }

        for encoder in &self.encoders {
            if !self.schema.categorical().contains(&encoder.column) {
                return Err(AppError::ArtifactCorrupt(format!(
                    "Encoder column '{}' is not categorical in the stored schema",
                    encoder.column
                )));
            }
            let unique: HashSet<&String> = encoder.categories.iter().collect();
            if encoder.categories.is_empty() || unique.len() != encoder.categories.len() {
                return Err(AppError::ArtifactCorrupt(format!(
                    "Invalid vocabulary for column '{}'",
                    encoder.column
                )));
            }
        }

        if self.feature_names != build_feature_names(&self.scalers, &self.encoders) {
            return Err(AppError::ArtifactCorrupt(
                "Stored feature names do not match the fitted columns".to_string(),
            ));
        }

        Ok(())
    }

    /// Encode as a preprocessor artifact
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(ArtifactKind::Preprocessor, self)
    }

    /// Decode a preprocessor artifact
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let transform: Self = codec::decode(ArtifactKind::Preprocessor, bytes)?;
        transform.check_invariants()?;
        Ok(transform)
    }

    /// Persist under `name`, returning the pinned handle of the new version
    pub async fn save(&self, store: &dyn ArtifactStore, name: &str) -> Result<ArtifactHandle> {
        let bytes = self.to_bytes()?;
        let handle = store.write(name, bytes).await?;
        info!(artifact = %handle, n_features = self.n_features(), "Saved preprocessor");
        Ok(handle)
    }

    pub async fn load(store: &dyn ArtifactStore, handle: &ArtifactHandle) -> Result<Self> {
        let bytes = store.read(handle).await?;
        let transform = Self::from_bytes(&bytes)?;
        debug!(artifact = %handle, n_features = transform.n_features(), "Loaded preprocessor");
        Ok(transform)
    }
}

/// Preprocessor lifecycle: declared with a schema, usable only once fitted or loaded
#[derive(Debug, Clone)]
pub enum Preprocessor {
    Unfitted(FeatureSchema),
    Fitted(FittedTransform),
}

impl Preprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Preprocessor::Unfitted(schema)
    }

    pub fn schema(&self) -> &FeatureSchema {
        match self {
            Preprocessor::Unfitted(schema) => schema,
            Preprocessor::Fitted(fitted) => fitted.schema(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Preprocessor::Fitted(_))
    }

    /// The fitted state, or `NotFitted`
    pub fn fitted(&self) -> Result<&FittedTransform> {
        match self {
            Preprocessor::Fitted(fitted) => Ok(fitted),
            Preprocessor::Unfitted(_) => Err(AppError::NotFitted),
        }
    }

    /// Fit (or refit) on a training table using this preprocessor's schema
    pub fn fit<R: Record>(&mut self, rows: &[R]) -> Result<&FittedTransform> {
        let fitted = FittedTransform::fit(rows, self.schema())?;
        *self = Preprocessor::Fitted(fitted);
        self.fitted()
    }

    pub fn fit_transform<R: Record>(&mut self, rows: &[R]) -> Result<Array2<f64>> {
        self.fit(rows)?.transform(rows)
    }

    pub fn transform<R: Record>(&self, records: &[R]) -> Result<Array2<f64>> {
        self.fitted()?.transform(records)
    }

    pub fn transform_one<R: Record + ?Sized>(&self, record: &R) -> Result<Vec<f64>> {
        self.fitted()?.transform_one(record)
    }

    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(self.fitted()?.feature_names())
    }

    pub async fn save(&self, store: &dyn ArtifactStore, name: &str) -> Result<ArtifactHandle> {
        self.fitted()?.save(store, name).await
    }

    pub async fn load(store: &dyn ArtifactStore, handle: &ArtifactHandle) -> Result<Self> {
        FittedTransform::load(store, handle).await.map(Preprocessor::Fitted)
    }
}

impl From<FittedTransform> for Preprocessor {
    fn from(fitted: FittedTransform) -> Self {
        Preprocessor::Fitted(fitted)
    }
}
