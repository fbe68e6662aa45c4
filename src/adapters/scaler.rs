//! Standard-scaler adapter: Implementation of `FeatureScaler`.
//!
//! Reproduces the fitted `(x - center) / scale` transform from exported
//! calibration constants. The constants are opaque: they are loaded, checked
//! for shape and finiteness, and never recomputed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::artifact::{self, ArtifactError, ArtifactInfo, ArtifactOptions};
use crate::domain::{FeatureVector, ScaledVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::{FeatureScaler, ScoringError};

const ARTIFACT: &str = "scaler";

/// Scaler parameters as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedScaler {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(alias = "mean", alias = "mean_")]
    pub center: Vec<f64>,
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
}

/// Fitted standard scaler.
#[derive(Debug, Clone)]
pub struct StandardScalerAdapter {
    center: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
    info: Option<ArtifactInfo>,
}

impl StandardScalerAdapter {
    /// Build from in-memory parameters.
    ///
    /// # Errors
    /// Returns `ArtifactError` on wrong lengths, mismatched feature names or
    /// non-finite constants.
    pub fn from_exported(exported: ExportedScaler) -> Result<Self, ArtifactError> {
        super::check_feature_names(ARTIFACT, &exported.feature_names)?;

        let center = to_fixed(&exported.center, "center")?;
        let mut scale = to_fixed(&exported.scale, "scale")?;

        for (i, s) in scale.iter_mut().enumerate() {
            if !s.is_finite() || *s < 0.0 {
                return Err(ArtifactError::Parameter {
                    artifact: ARTIFACT,
                    detail: format!(
                        "scale for {} must be finite and >= 0, got {s}",
                        FEATURE_NAMES[i]
                    ),
                });
            }
            // A constant column is fitted with scale 0; it is left unscaled.
            if *s == 0.0 {
                tracing::debug!("Scale for {} is zero; using 1.0", FEATURE_NAMES[i]);
                *s = 1.0;
            }
        }
        if let Some(i) = center.iter().position(|c| !c.is_finite()) {
            return Err(ArtifactError::Parameter {
                artifact: ARTIFACT,
                detail: format!("center for {} is not finite", FEATURE_NAMES[i]),
            });
        }

        Ok(Self {
            center,
            scale,
            info: None,
        })
    }

    /// Load from a JSON artifact.
    ///
    /// # Errors
    /// Returns `ArtifactError` if reading, manifest verification or
    /// validation fails.
    pub fn load(path: &Path, options: ArtifactOptions) -> Result<Self, ArtifactError> {
        let (exported, info): (ExportedScaler, _) = artifact::load_json(path, options)?;
        let mut adapter = Self::from_exported(exported)?;
        adapter.info = Some(info);
        Ok(adapter)
    }

    /// Identity of the artifact this scaler came from, if loaded from disk.
    #[must_use]
    pub fn artifact_info(&self) -> Option<&ArtifactInfo> {
        self.info.as_ref()
    }
}

fn to_fixed(values: &[f64], what: &str) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    values.try_into().map_err(|_| ArtifactError::Shape {
        artifact: ARTIFACT,
        detail: format!("{what} has {} entries, expected {FEATURE_COUNT}", values.len()),
    })
}

impl FeatureScaler for StandardScalerAdapter {
    fn transform(&self, features: &FeatureVector) -> Result<ScaledVector, ScoringError> {
        let raw = features.as_array();
        let mut scaled = [0.0; FEATURE_COUNT];

        for i in 0..FEATURE_COUNT {
            let v = (raw[i] - self.center[i]) / self.scale[i];
            if !v.is_finite() {
                return Err(ScoringError::NonFiniteScaled {
                    feature: FEATURE_NAMES[i],
                });
            }
            scaled[i] = v;
        }

        Ok(ScaledVector::new(scaled))
    }
}
