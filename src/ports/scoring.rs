//! Scoring ports: Traits for the fitted scaler and classifier.
//!
//! These traits keep the prediction pipeline independent of how the fitted
//! parameters were exported.

use crate::domain::{ClassLabel, FeatureVector, ProbabilityPair, ScaledVector};

/// Faults raised inside a scaler or classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("Non-finite scaled value for feature {feature}")]
    NonFiniteScaled { feature: &'static str },

    #[error("Non-finite logit for class {class}")]
    NonFiniteLogit { class: usize },

    #[error("Invalid probability output: {0}")]
    InvalidProbability(String),
}

/// A fitted per-feature normalization.
pub trait FeatureScaler: Send + Sync {
    /// Apply the fitted transform.
    ///
    /// # Errors
    /// Returns `ScoringError::NonFiniteScaled` if the transform overflows.
    fn transform(&self, features: &FeatureVector) -> Result<ScaledVector, ScoringError>;
}

/// A fitted binary classifier exposing class probabilities.
pub trait ProbabilisticClassifier: Send + Sync {
    /// Class probabilities for one scaled input.
    ///
    /// # Errors
    /// Returns a `ScoringError` if the arithmetic produces non-finite values.
    fn predict_proba(&self, input: &ScaledVector) -> Result<ProbabilityPair, ScoringError>;

    /// The classifier's own decision (argmax of [`Self::predict_proba`]).
    ///
    /// # Errors
    /// Same as [`Self::predict_proba`].
    fn predict(&self, input: &ScaledVector) -> Result<ClassLabel, ScoringError> {
        self.predict_proba(input).map(|p| p.argmax())
    }
}
