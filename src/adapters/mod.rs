//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifact`: JSON artifact loading, fingerprints and manifest binding
//! - `scaler`: fitted standard scaler
//! - `logistic`: fitted logistic regression
//! - `sanitize`: clinical-value filtering for logs

pub mod artifact;
pub mod logistic;
pub mod sanitize;
pub mod scaler;

pub use artifact::{ArtifactError, ArtifactInfo, ArtifactOptions};
pub use logistic::LogisticRegressionAdapter;
pub use scaler::StandardScalerAdapter;

use crate::domain::FEATURE_NAMES;

/// Exported feature names are optional, but when present they must match the
/// schema order exactly.
fn check_feature_names(artifact: &'static str, names: &[String]) -> Result<(), ArtifactError> {
    if names.is_empty() {
        return Ok(());
    }
    if names.len() != FEATURE_NAMES.len()
        || names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
    {
        return Err(ArtifactError::Shape {
            artifact,
            detail: format!(
                "feature_names {names:?} do not match the expected order {FEATURE_NAMES:?}"
            ),
        });
    }
    Ok(())
}
