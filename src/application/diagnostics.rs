//! Degeneracy diagnostic: load-time smoke test of a freshly loaded model.
//!
//! The model is scored on a batch of unit-variance Gaussian noise vectors.
//! Noise stands in for already-centered inputs, so the scaler is bypassed.
//! If every probe receives the same label, the decision boundary is treated
//! as collapsed and the degeneracy flag is raised.
//!
//! This is a heuristic: a model that is only degenerate away from the origin
//! can pass. Given a fixed seed the outcome is reproducible, which keeps
//! multi-worker deployments consistent.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use crate::domain::{ClassLabel, DiagnosticFlag, ScaledVector, FEATURE_COUNT};
use crate::ports::{ProbabilisticClassifier, ScoringError};

/// Number of synthetic probes drawn per diagnosis.
pub const DEFAULT_PROBE_BATCH: usize = 10;

/// Seed used when none is configured.
pub const DEFAULT_PROBE_SEED: u64 = 42;

/// Source of synthetic probe vectors.
pub trait ProbeSource {
    fn next_probe(&mut self) -> ScaledVector;
}

/// Standard-normal probes from a seeded ChaCha20 stream.
pub struct GaussianProbe {
    rng: ChaCha20Rng,
    /// Second Box-Muller output, kept for the next draw.
    spare: Option<f64>,
}

impl GaussianProbe {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Draw one N(0, 1) sample.
    pub fn sample_standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }

        // u1 in (0, 1] so ln(u1) is finite.
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen();

        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;

        self.spare = Some(radius * angle.sin());
        radius * angle.cos()
    }
}

impl ProbeSource for GaussianProbe {
    fn next_probe(&mut self) -> ScaledVector {
        let mut v = [0.0; FEATURE_COUNT];
        for x in &mut v {
            *x = self.sample_standard_normal();
        }
        ScaledVector::new(v)
    }
}

/// Outcome of one diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub flag: DiagnosticFlag,
    pub batch_size: usize,
    /// Seed of the Gaussian probe, when one was used
    pub seed: Option<u64>,
    /// Number of probes labelled positive
    pub positive_count: usize,
    /// The single label every probe received, when degenerate
    pub constant_class: Option<ClassLabel>,
}

impl DiagnosticReport {
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.flag.is_degenerate()
    }
}

/// Configured degeneracy check.
#[derive(Debug, Clone, Copy)]
pub struct DegeneracyDiagnostic {
    batch_size: usize,
}

impl Default for DegeneracyDiagnostic {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_PROBE_BATCH,
        }
    }
}

impl DegeneracyDiagnostic {
    /// Diagnostic with a custom batch size.
    ///
    /// # Errors
    /// A batch smaller than 2 would flag every model, so it is rejected.
    pub fn with_batch_size(batch_size: usize) -> Result<Self, String> {
        if batch_size < 2 {
            return Err(format!("probe batch size must be at least 2, got {batch_size}"));
        }
        Ok(Self { batch_size })
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Probe `model` with seeded Gaussian noise.
    ///
    /// # Errors
    /// Propagates scoring faults from the model.
    pub fn diagnose<M>(&self, model: &M, seed: u64) -> Result<DiagnosticReport, ScoringError>
    where
        M: ProbabilisticClassifier + ?Sized,
    {
        let mut probes = GaussianProbe::seeded(seed);
        let mut report = self.diagnose_with(model, &mut probes)?;
        report.seed = Some(seed);
        Ok(report)
    }

    /// Probe `model` with vectors from an arbitrary source.
    ///
    /// # Errors
    /// Propagates scoring faults from the model.
    pub fn diagnose_with<M, P>(
        &self,
        model: &M,
        probes: &mut P,
    ) -> Result<DiagnosticReport, ScoringError>
    where
        M: ProbabilisticClassifier + ?Sized,
        P: ProbeSource + ?Sized,
    {
        tracing::info!("Diagnosing model with {} synthetic probes...", self.batch_size);

        let mut positive_count = 0;
        for _ in 0..self.batch_size {
            if model.predict(&probes.next_probe())? == ClassLabel::Positive {
                positive_count += 1;
            }
        }

        let constant_class = if positive_count == 0 {
            Some(ClassLabel::Negative)
        } else if positive_count == self.batch_size {
            Some(ClassLabel::Positive)
        } else {
            None
        };

        match constant_class {
            Some(class) => tracing::warn!(
                "ALERT: model predicts {} for all {} probes; enabling threshold override",
                class,
                self.batch_size
            ),
            None => tracing::info!(
                "Model predictions vary across probes ({}/{} positive)",
                positive_count,
                self.batch_size
            ),
        }

        Ok(DiagnosticReport {
            flag: DiagnosticFlag::from(constant_class.is_some()),
            batch_size: self.batch_size,
            seed: None,
            positive_count,
            constant_class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::logistic::LogisticRegressionAdapter;

    /// Cycles through a fixed list of probes.
    struct FixedProbes {
        probes: Vec<ScaledVector>,
        next: usize,
    }

    impl ProbeSource for FixedProbes {
        fn next_probe(&mut self) -> ScaledVector {
            let p = self.probes[self.next % self.probes.len()];
            self.next += 1;
            p
        }
    }

    fn first_feature(value: f64) -> ScaledVector {
        let mut v = [0.0; FEATURE_COUNT];
        v[0] = value;
        ScaledVector::new(v)
    }

    fn first_feature_model() -> LogisticRegressionAdapter {
        let mut w = [0.0; FEATURE_COUNT];
        w[0] = 4.0;
        LogisticRegressionAdapter::binary(w, 0.0).expect("valid")
    }

    #[test]
    fn test_constant_negative_model_is_degenerate() {
        let model = LogisticRegressionAdapter::binary([0.0; FEATURE_COUNT], -3.0).expect("valid");
        let report = DegeneracyDiagnostic::default()
            .diagnose(&model, 7)
            .expect("diagnose");

        assert!(report.is_degenerate());
        assert_eq!(report.constant_class, Some(ClassLabel::Negative));
        assert_eq!(report.positive_count, 0);
        assert_eq!(report.batch_size, DEFAULT_PROBE_BATCH);
        assert_eq!(report.seed, Some(7));
    }

    #[test]
    fn test_constant_positive_model_is_degenerate() {
        let model = LogisticRegressionAdapter::binary([0.0; FEATURE_COUNT], 3.0).expect("valid");
        let report = DegeneracyDiagnostic::default()
            .diagnose(&model, 7)
            .expect("diagnose");

        assert!(report.is_degenerate());
        assert_eq!(report.constant_class, Some(ClassLabel::Positive));
        assert_eq!(report.positive_count, DEFAULT_PROBE_BATCH);
    }

    #[test]
    fn test_varied_predictions_are_not_degenerate() {
        let model = first_feature_model();
        let mut probes = FixedProbes {
            probes: vec![first_feature(-1.0), first_feature(1.0)],
            next: 0,
        };

        let report = DegeneracyDiagnostic::default()
            .diagnose_with(&model, &mut probes)
            .expect("diagnose");
        assert!(!report.is_degenerate());
        assert_eq!(report.positive_count, 5);
        assert_eq!(report.constant_class, None);
        assert_eq!(report.seed, None);
    }

    #[test]
    fn test_single_differing_probe_clears_flag() {
        let model = first_feature_model();
        let mut probes = vec![first_feature(-1.0); 9];
        probes.push(first_feature(1.0));
        let mut source = FixedProbes { probes, next: 0 };

        let report = DegeneracyDiagnostic::default()
            .diagnose_with(&model, &mut source)
            .expect("diagnose");
        assert!(!report.is_degenerate());
        assert_eq!(report.positive_count, 1);
    }

    #[test]
    fn test_seeded_diagnosis_is_repeatable() {
        let model = first_feature_model();
        let diagnostic = DegeneracyDiagnostic::default();

        for seed in [0, 1, 42, 1234] {
            let a = diagnostic.diagnose(&model, seed).expect("diagnose");
            let b = diagnostic.diagnose(&model, seed).expect("diagnose");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_gaussian_probe_is_deterministic_per_seed() {
        let mut a = GaussianProbe::seeded(99);
        let mut b = GaussianProbe::seeded(99);
        let mut c = GaussianProbe::seeded(100);

        let pa = a.next_probe();
        assert_eq!(pa, b.next_probe());
        assert_ne!(pa, c.next_probe());
    }

    #[test]
    fn test_gaussian_probe_moments() {
        let mut probe = GaussianProbe::seeded(2024);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| probe.sample_standard_normal()).collect();

        assert!(samples.iter().all(|x| x.is_finite()));
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance {var}");
    }

    #[test]
    fn test_batch_size_validation() {
        assert!(DegeneracyDiagnostic::with_batch_size(1).is_err());
        assert!(DegeneracyDiagnostic::with_batch_size(0).is_err());
        assert_eq!(
            DegeneracyDiagnostic::with_batch_size(25)
                .expect("valid")
                .batch_size(),
            25
        );
    }
}
