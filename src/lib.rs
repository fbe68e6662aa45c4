//! # Hepatica
//!
//! Hepatitis risk prediction from a pre-fitted logistic-regression model,
//! with a load-time check that compensates for a degenerate model.
//!
//! This crate provides:
//! - Strict validation of the 21-feature clinical payload
//! - Scaling and scoring with exported scaler/model parameters
//! - A degeneracy diagnostic run once when the model loads
//! - A decision policy that corrects a collapsed model's decisions
//! - An HTTP service (form page and JSON API)
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Feature schema, prediction types, decision policy
//! - `ports`: Scaler and classifier traits
//! - `adapters`: Artifact loading, fitted scaler and model, log sanitizer
//! - `application`: Degeneracy diagnostic and the prediction service
//! - `config`: Environment and CLI configuration
//! - `http`: axum router and handlers

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod ports;

pub use application::PredictionService;
pub use domain::{ClassLabel, FeatureVector, PredictionResult, ProbabilityPair};

/// Result type for Hepatica operations
pub type Result<T> = std::result::Result<T, HepaticaError>;

/// Main error type for Hepatica
#[derive(Debug, thiserror::Error)]
pub enum HepaticaError {
    #[error(transparent)]
    Schema(#[from] domain::SchemaError),

    #[error("Scaler not loaded")]
    ScalerNotLoaded,

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Scoring failed: {0}")]
    ScoringFailure(#[from] ports::ScoringError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
