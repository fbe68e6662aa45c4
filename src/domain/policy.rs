//! Decision policy: turns raw class probabilities into the reported class.
//!
//! A model flagged as degenerate at load time keeps collapsing onto the
//! negative class, so its argmax is replaced by a lowered bar for the
//! positive class. A healthy model's argmax passes through untouched.

use serde::{Deserialize, Serialize};

use super::prediction::{ClassLabel, DiagnosticFlag, PredictionResult, ProbabilityPair};

/// Positive-class threshold applied while the degeneracy override is active.
pub const DEFAULT_POSITIVE_THRESHOLD: f64 = 0.3;

pub const DEFAULT_DEGENERATE_MESSAGE: &str =
    "Model with possible class imbalance - verify probabilities";

pub const DEFAULT_NORMAL_MESSAGE: &str = "Normal prediction";

/// Tunable parameters of the decision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// `p_pos` must be strictly above this to report the positive class
    /// when the model is degenerate.
    pub positive_threshold: f64,

    /// Message attached to every result while the override is active.
    pub degenerate_message: String,

    /// Message attached to every result from a healthy model.
    pub normal_message: String,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
            degenerate_message: DEFAULT_DEGENERATE_MESSAGE.to_string(),
            normal_message: DEFAULT_NORMAL_MESSAGE.to_string(),
        }
    }
}

impl DecisionPolicy {
    /// Policy with a custom threshold and default messages.
    ///
    /// # Errors
    /// Rejects thresholds that are not finite or fall outside `[0, 1]`.
    pub fn with_threshold(positive_threshold: f64) -> Result<Self, String> {
        if !positive_threshold.is_finite() || !(0.0..=1.0).contains(&positive_threshold) {
            return Err(format!(
                "positive threshold must be within [0, 1], got {positive_threshold}"
            ));
        }
        Ok(Self {
            positive_threshold,
            ..Self::default()
        })
    }

    /// Produce the final result for one scored input.
    #[must_use]
    pub fn decide(
        &self,
        raw: ProbabilityPair,
        flag: DiagnosticFlag,
        raw_class: ClassLabel,
    ) -> PredictionResult {
        let corrected_class = if flag.is_degenerate() {
            if raw.positive() > self.positive_threshold {
                ClassLabel::Positive
            } else {
                ClassLabel::Negative
            }
        } else {
            raw_class
        };

        let message = if flag.is_degenerate() {
            self.degenerate_message.clone()
        } else {
            self.normal_message.clone()
        };

        PredictionResult {
            raw_class,
            corrected_class,
            probabilities: raw,
            confidence: raw.max(),
            degenerate: flag.is_degenerate(),
            message,
        }
    }
}
