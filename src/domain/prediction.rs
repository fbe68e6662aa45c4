//! Prediction value types.
//!
//! Represents the output of the hepatitis classifier before and after the
//! decision policy has been applied.

use serde::{Deserialize, Serialize};

/// Tolerance for `p_neg + p_pos == 1`.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Binary outcome of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ClassLabel {
    /// No hepatitis (class 0)
    Negative,
    /// Hepatitis (class 1)
    Positive,
}

impl ClassLabel {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }

    /// Label shown to users.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Negative => "NO HEPATITIS",
            Self::Positive => "HEPATITIS",
        }
    }
}

impl From<ClassLabel> for u8 {
    fn from(label: ClassLabel) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for ClassLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Negative),
            1 => Ok(Self::Positive),
            other => Err(format!("class label must be 0 or 1, got {other}")),
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Class probabilities `(negative, positive)`.
///
/// Both components lie in `[0, 1]` and sum to 1 within
/// [`PROBABILITY_SUM_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPair {
    negative: f64,
    positive: f64,
}

impl ProbabilityPair {
    /// Create a pair, checking range and normalization.
    ///
    /// # Errors
    /// Returns a description of the violation.
    pub fn new(negative: f64, positive: f64) -> Result<Self, String> {
        let in_range = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if !in_range(negative) || !in_range(positive) {
            return Err(format!(
                "probabilities out of range: negative={negative}, positive={positive}"
            ));
        }
        if ((negative + positive) - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(format!(
                "probabilities do not sum to 1: negative={negative}, positive={positive}"
            ));
        }
        Ok(Self { negative, positive })
    }

    #[must_use]
    pub fn negative(&self) -> f64 {
        self.negative
    }

    #[must_use]
    pub fn positive(&self) -> f64 {
        self.positive
    }

    /// The larger of the two probabilities.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.negative.max(self.positive)
    }

    /// Argmax decision; a tie goes to the negative class.
    #[must_use]
    pub fn argmax(&self) -> ClassLabel {
        if self.positive > self.negative {
            ClassLabel::Positive
        } else {
            ClassLabel::Negative
        }
    }
}

/// Load-time verdict on whether the model's raw labels can be trusted.
///
/// Computed once when the model is loaded and passed by value afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticFlag(bool);

impl DiagnosticFlag {
    pub const NORMAL: Self = Self(false);
    pub const DEGENERATE: Self = Self(true);

    #[must_use]
    pub fn is_degenerate(self) -> bool {
        self.0
    }
}

impl From<bool> for DiagnosticFlag {
    fn from(degenerate: bool) -> Self {
        Self(degenerate)
    }
}

/// Final, user-facing prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The model's own argmax decision
    pub raw_class: ClassLabel,

    /// Decision after the policy was applied
    pub corrected_class: ClassLabel,

    /// Raw class probabilities
    pub probabilities: ProbabilityPair,

    /// `max(p_neg, p_pos)`; describes the probability pair, not `corrected_class`
    pub confidence: f64,

    /// Whether the degeneracy override was in effect
    pub degenerate: bool,

    /// Human-readable explanation tied to `degenerate`
    pub message: String,
}

impl PredictionResult {
    /// True when the policy changed the model's decision.
    #[must_use]
    pub fn was_overridden(&self) -> bool {
        self.raw_class != self.corrected_class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_pair_validation() {
        assert!(ProbabilityPair::new(0.7, 0.3).is_ok());
        assert!(ProbabilityPair::new(0.5, 0.4).is_err());
        assert!(ProbabilityPair::new(-0.1, 1.1).is_err());
        assert!(ProbabilityPair::new(f64::NAN, 0.5).is_err());
        assert!(ProbabilityPair::new(1.0 - 5e-7, 0.0).is_ok());
    }

    #[test]
    fn test_argmax_tie_is_negative() {
        let p = ProbabilityPair::new(0.5, 0.5).expect("valid");
        assert_eq!(p.argmax(), ClassLabel::Negative);
        assert_eq!(p.max(), 0.5);

        let p = ProbabilityPair::new(0.2, 0.8).expect("valid");
        assert_eq!(p.argmax(), ClassLabel::Positive);
        assert_eq!(p.max(), 0.8);
    }

    #[test]
    fn test_class_label_serializes_as_integer() {
        let json = serde_json::to_string(&ClassLabel::Positive).expect("serialize");
        assert_eq!(json, "1");
        let back: ClassLabel = serde_json::from_str("0").expect("deserialize");
        assert_eq!(back, ClassLabel::Negative);
        assert!(serde_json::from_str::<ClassLabel>("2").is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ClassLabel::Positive.to_string(), "HEPATITIS");
        assert_eq!(ClassLabel::Negative.to_string(), "NO HEPATITIS");
    }

    #[test]
    fn test_flag_from_bool() {
        assert!(DiagnosticFlag::from(true).is_degenerate());
        assert_eq!(DiagnosticFlag::default(), DiagnosticFlag::NORMAL);
    }
}
