//! Feature preprocessing, models and the composed predictor.

pub mod dataset;
pub mod model;
pub mod predictor;
pub mod preprocessor;
pub mod schema;
pub mod training;

pub use dataset::{parse_label, LabelledTable};
pub use model::{
    sigmoid, ChurnModel, LogisticModel, ModelArtifact, ModelMetadata, ModelMetrics,
    ProbabilisticModel,
};
pub use predictor::Predictor;
pub use preprocessor::{CategoricalEncoder, FittedTransform, NumericScaler, Preprocessor};
pub use schema::{ColumnRole, FeatureSchema};
pub use training::{train_baseline, PublishedArtifacts, TrainedPipeline};
