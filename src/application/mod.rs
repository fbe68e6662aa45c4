//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement the
//! prediction use case and its load-time diagnostic.

pub mod diagnostics;
mod prediction;

pub use diagnostics::{
    DegeneracyDiagnostic, DiagnosticReport, GaussianProbe, ProbeSource, DEFAULT_PROBE_BATCH,
    DEFAULT_PROBE_SEED,
};
pub use prediction::{PredictionService, ProbeSettings};
