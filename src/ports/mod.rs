//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary between
//! the prediction use case and the fitted artifacts it scores with.

mod scoring;

pub use scoring::{FeatureScaler, ProbabilisticClassifier, ScoringError};
