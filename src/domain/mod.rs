//! Domain layer: Core prediction types and logic.
//!
//! Pure Rust types with no I/O. All payloads are validated into these
//! types before the rest of the crate sees them.

mod features;
mod policy;
mod prediction;

pub use features::{
    fixtures, FeatureVector, RawFeatures, RawField, ScaledVector, SchemaError, FEATURE_COUNT,
    FEATURE_NAMES,
};
pub use policy::{
    DecisionPolicy, DEFAULT_DEGENERATE_MESSAGE, DEFAULT_NORMAL_MESSAGE, DEFAULT_POSITIVE_THRESHOLD,
};
pub use prediction::{
    ClassLabel, DiagnosticFlag, PredictionResult, ProbabilityPair, PROBABILITY_SUM_TOLERANCE,
};
