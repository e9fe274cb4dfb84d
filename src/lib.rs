//! Attrition-risk scoring for employee records.
//!
//! A [`ml::Preprocessor`] learns standardization and one-hot vocabularies from a
//! historical table; a [`ml::Predictor`] combines the fitted transform with a trained
//! model to turn one record, or a batch, into a churn probability, a binary decision
//! and a risk tier. Both artifacts live in an [`artifacts::ArtifactStore`].

pub mod artifacts;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod serving;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
