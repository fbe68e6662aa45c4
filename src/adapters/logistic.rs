//! Logistic-regression adapter: Implementation of `ProbabilisticClassifier`.
//!
//! Scores a scaled vector as a linear combination plus a per-class intercept,
//! then normalizes the two class logits with a softmax.
//!
//! Two export layouts are accepted:
//! - binary form: one coefficient row `w` and one intercept `b`; the class
//!   logits are `[0, w·x + b]`, which is the usual `sigmoid` decision.
//! - explicit form: two rows and two intercepts, one per class.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::artifact::{self, ArtifactError, ArtifactInfo, ArtifactOptions};
use crate::domain::{ProbabilityPair, ScaledVector, FEATURE_COUNT};
use crate::ports::{ProbabilisticClassifier, ScoringError};

const ARTIFACT: &str = "model";

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

/// Model parameters as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedLogisticModel {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default = "default_classes", alias = "classes_")]
    pub classes: Vec<i64>,
    #[serde(alias = "coef_")]
    pub coef: Vec<Vec<f64>>,
    #[serde(alias = "intercept_")]
    pub intercept: Vec<f64>,
}

/// Shape and intercept information for operator output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub classes: Vec<i64>,
    /// `(rows, columns)` of the coefficient matrix
    pub coef_shape: (usize, usize),
    pub intercept: Vec<f64>,
}

/// Fitted binary logistic regression.
#[derive(Debug, Clone)]
pub struct LogisticRegressionAdapter {
    /// One row (binary form) or two rows (one per class).
    weights: Vec<[f64; FEATURE_COUNT]>,
    intercepts: Vec<f64>,
    classes: Vec<i64>,
    info: Option<ArtifactInfo>,
}

impl LogisticRegressionAdapter {
    /// Build from in-memory parameters.
    ///
    /// # Errors
    /// Returns `ArtifactError` on wrong shapes, unexpected class labels,
    /// mismatched feature names or non-finite parameters.
    pub fn from_exported(exported: ExportedLogisticModel) -> Result<Self, ArtifactError> {
        super::check_feature_names(ARTIFACT, &exported.feature_names)?;

        if exported.classes != [0, 1] {
            return Err(ArtifactError::Parameter {
                artifact: ARTIFACT,
                detail: format!("classes must be [0, 1], got {:?}", exported.classes),
            });
        }

        let rows = exported.coef.len();
        if rows != 1 && rows != 2 {
            return Err(ArtifactError::Shape {
                artifact: ARTIFACT,
                detail: format!("coef must have 1 or 2 rows, got {rows}"),
            });
        }
        if exported.intercept.len() != rows {
            return Err(ArtifactError::Shape {
                artifact: ARTIFACT,
                detail: format!(
                    "intercept has {} entries but coef has {rows} rows",
                    exported.intercept.len()
                ),
            });
        }

        let mut weights = Vec::with_capacity(rows);
        for (r, row) in exported.coef.iter().enumerate() {
            let fixed: [f64; FEATURE_COUNT] =
                row.as_slice().try_into().map_err(|_| ArtifactError::Shape {
                    artifact: ARTIFACT,
                    detail: format!(
                        "coef row {r} has {} entries, expected {FEATURE_COUNT}",
                        row.len()
                    ),
                })?;
            if fixed.iter().any(|w| !w.is_finite()) {
                return Err(ArtifactError::Parameter {
                    artifact: ARTIFACT,
                    detail: format!("coef row {r} contains non-finite values"),
                });
            }
            weights.push(fixed);
        }
        if exported.intercept.iter().any(|b| !b.is_finite()) {
            return Err(ArtifactError::Parameter {
                artifact: ARTIFACT,
                detail: "intercept contains non-finite values".into(),
            });
        }

        Ok(Self {
            weights,
            intercepts: exported.intercept,
            classes: exported.classes,
            info: None,
        })
    }

    /// Binary-form model from a single weight row and intercept.
    ///
    /// # Errors
    /// Returns `ArtifactError` if any parameter is non-finite.
    pub fn binary(weights: [f64; FEATURE_COUNT], intercept: f64) -> Result<Self, ArtifactError> {
        Self::from_exported(ExportedLogisticModel {
            feature_names: Vec::new(),
            classes: default_classes(),
            coef: vec![weights.to_vec()],
            intercept: vec![intercept],
        })
    }

    /// Load from a JSON artifact.
    ///
    /// # Errors
    /// Returns `ArtifactError` if reading, manifest verification or
    /// validation fails.
    pub fn load(path: &Path, options: ArtifactOptions) -> Result<Self, ArtifactError> {
        let (exported, info): (ExportedLogisticModel, _) = artifact::load_json(path, options)?;
        let mut adapter = Self::from_exported(exported)?;
        tracing::info!(
            "Logistic model ready (rows={}, n_features={}, intercept={:?})",
            adapter.weights.len(),
            FEATURE_COUNT,
            adapter.intercepts
        );
        adapter.info = Some(info);
        Ok(adapter)
    }

    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            classes: self.classes.clone(),
            coef_shape: (self.weights.len(), FEATURE_COUNT),
            intercept: self.intercepts.clone(),
        }
    }

    /// Identity of the artifact this model came from, if loaded from disk.
    #[must_use]
    pub fn artifact_info(&self) -> Option<&ArtifactInfo> {
        self.info.as_ref()
    }

    fn logits(&self, input: &ScaledVector) -> [f64; 2] {
        let z = |row: &[f64; FEATURE_COUNT], b: f64| {
            row.iter()
                .zip(input.as_array())
                .fold(b, |acc, (w, x)| acc + w * x)
        };

        match self.weights.as_slice() {
            [row] => [0.0, z(row, self.intercepts[0])],
            [neg, pos] => [z(neg, self.intercepts[0]), z(pos, self.intercepts[1])],
            // Rows are validated to be 1 or 2 at construction.
            _ => [f64::NAN, f64::NAN],
        }
    }
}

fn softmax2(logits: [f64; 2]) -> [f64; 2] {
    let m = logits[0].max(logits[1]);
    let e0 = (logits[0] - m).exp();
    let e1 = (logits[1] - m).exp();
    let sum = e0 + e1;
    [e0 / sum, e1 / sum]
}

impl ProbabilisticClassifier for LogisticRegressionAdapter {
    fn predict_proba(&self, input: &ScaledVector) -> Result<ProbabilityPair, ScoringError> {
        let logits = self.logits(input);
        if let Some(class) = logits.iter().position(|l| !l.is_finite()) {
            return Err(ScoringError::NonFiniteLogit { class });
        }

        let [negative, positive] = softmax2(logits);
        ProbabilityPair::new(negative, positive).map_err(ScoringError::InvalidProbability)
    }
}
