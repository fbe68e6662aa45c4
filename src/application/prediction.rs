//! Prediction service: Orchestrates the hepatitis risk pipeline.
//!
//! This service coordinates:
//! - Schema validation of raw payloads
//! - Feature scaling
//! - Model scoring
//! - The decision policy, informed by the load-time degeneracy diagnostic
//!
//! The service is assembled mutably during startup (`load_scaler`,
//! `load_model`) and only read afterwards, so it can be shared behind an
//! `Arc` across request handlers without locking.

use crate::application::diagnostics::{DegeneracyDiagnostic, DiagnosticReport, DEFAULT_PROBE_SEED};
use crate::domain::{
    DecisionPolicy, DiagnosticFlag, FeatureVector, PredictionResult, RawFeatures, FEATURE_COUNT,
    FEATURE_NAMES,
};
use crate::ports::{FeatureScaler, ProbabilisticClassifier};
use crate::HepaticaError;

/// Degeneracy probe settings.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub diagnostic: DegeneracyDiagnostic,
    pub seed: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            diagnostic: DegeneracyDiagnostic::default(),
            seed: DEFAULT_PROBE_SEED,
        }
    }
}

/// Service answering prediction requests.
pub struct PredictionService<S, M>
where
    S: FeatureScaler,
    M: ProbabilisticClassifier,
{
    scaler: Option<S>,
    model: Option<M>,
    /// Set together with `model`, never on its own.
    diagnostic: Option<DiagnosticReport>,
    policy: DecisionPolicy,
    probe: ProbeSettings,
}

impl<S, M> PredictionService<S, M>
where
    S: FeatureScaler,
    M: ProbabilisticClassifier,
{
    /// Create an empty service; nothing is loaded yet.
    #[must_use]
    pub fn new(policy: DecisionPolicy, probe: ProbeSettings) -> Self {
        Self {
            scaler: None,
            model: None,
            diagnostic: None,
            policy,
            probe,
        }
    }

    /// Install the fitted scaler.
    pub fn load_scaler(&mut self, scaler: S) {
        tracing::info!("Scaler loaded");
        self.scaler = Some(scaler);
    }

    /// Install the fitted model and run the degeneracy diagnostic on it.
    ///
    /// # Errors
    /// Returns `HepaticaError::ScoringFailure` if the model cannot score the
    /// probes; the model is not installed in that case.
    pub fn load_model(&mut self, model: M) -> Result<&DiagnosticReport, HepaticaError> {
        let report = self.probe.diagnostic.diagnose(&model, self.probe.seed)?;
        tracing::info!(
            "Model loaded (degenerate={}, seed={})",
            report.is_degenerate(),
            self.probe.seed
        );

        self.model = Some(model);
        Ok(self.diagnostic.insert(report))
    }

    /// Run the full pipeline on an untyped payload.
    ///
    /// # Errors
    /// Schema errors first, then `ScalerNotLoaded`, `ModelNotLoaded` or
    /// `ScoringFailure`.
    pub fn predict<R: RawFeatures + ?Sized>(
        &self,
        raw: &R,
    ) -> Result<PredictionResult, HepaticaError> {
        let features = FeatureVector::validate_and_order(raw)?;
        self.predict_features(&features)
    }

    /// Run the pipeline on an already validated vector.
    ///
    /// # Errors
    /// `ScalerNotLoaded`, `ModelNotLoaded` or `ScoringFailure`.
    pub fn predict_features(
        &self,
        features: &FeatureVector,
    ) -> Result<PredictionResult, HepaticaError> {
        let scaler = self.scaler.as_ref().ok_or(HepaticaError::ScalerNotLoaded)?;
        let model = self.model.as_ref().ok_or(HepaticaError::ModelNotLoaded)?;

        tracing::debug!("Step 1: Scaling features...");
        let scaled = scaler.transform(features)?;

        tracing::debug!("Step 2: Scoring...");
        let probabilities = model.predict_proba(&scaled)?;
        let raw_class = probabilities.argmax();

        tracing::debug!("Step 3: Applying decision policy...");
        let flag = self.flag();
        if flag.is_degenerate() {
            tracing::debug!("Applying threshold override for degenerate model");
        }
        let result = self.policy.decide(probabilities, flag, raw_class);

        tracing::info!(
            "Prediction complete: raw={}, corrected={}, p_pos={:.4}, confidence={:.2}%",
            result.raw_class.as_u8(),
            result.corrected_class.as_u8(),
            result.probabilities.positive(),
            result.confidence * 100.0
        );

        Ok(result)
    }

    /// True once both the scaler and the model are loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.scaler.is_some() && self.model.is_some()
    }

    #[must_use]
    pub fn is_scaler_loaded(&self) -> bool {
        self.scaler.is_some()
    }

    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// The ordered input schema.
    #[must_use]
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        FEATURE_NAMES
    }

    /// Current degeneracy status; `false` until a model is loaded.
    #[must_use]
    pub fn degeneracy_flag(&self) -> bool {
        self.flag().is_degenerate()
    }

    #[must_use]
    pub fn diagnostic_report(&self) -> Option<&DiagnosticReport> {
        self.diagnostic.as_ref()
    }

    #[must_use]
    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    #[must_use]
    pub fn scaler(&self) -> Option<&S> {
        self.scaler.as_ref()
    }

    #[must_use]
    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    fn flag(&self) -> DiagnosticFlag {
        self.diagnostic
            .as_ref()
            .map(|r| r.flag)
            .unwrap_or(DiagnosticFlag::NORMAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::logistic::LogisticRegressionAdapter;
    use crate::adapters::scaler::{ExportedScaler, StandardScalerAdapter};
    use crate::domain::{fixtures, ClassLabel, SchemaError, DEFAULT_DEGENERATE_MESSAGE};
    use crate::ports::ScoringError;
    use std::collections::HashMap;

    type Service = PredictionService<StandardScalerAdapter, LogisticRegressionAdapter>;

    const BILIRUBIN: usize = 15;
    const ALBUMIN: usize = 18;
    const PROTIME: usize = 19;

    fn scaler() -> StandardScalerAdapter {
        let mut center = vec![0.0; FEATURE_COUNT];
        let mut scale = vec![1.0; FEATURE_COUNT];
        center[BILIRUBIN] = 1.4;
        scale[BILIRUBIN] = 1.2;
        center[ALBUMIN] = 3.8;
        scale[ALBUMIN] = 0.65;
        center[PROTIME] = 60.0;
        scale[PROTIME] = 22.0;
        StandardScalerAdapter::from_exported(ExportedScaler {
            feature_names: Vec::new(),
            center,
            scale,
        })
        .expect("valid scaler")
    }

    /// Model that separates the reference patients.
    fn healthy_model() -> LogisticRegressionAdapter {
        let mut w = [0.0; FEATURE_COUNT];
        w[BILIRUBIN] = 1.0;
        w[ALBUMIN] = -1.0;
        w[PROTIME] = -0.5;
        LogisticRegressionAdapter::binary(w, -1.5).expect("valid model")
    }

    /// Model that ignores its input and always lands on p_pos ~= 0.35.
    fn collapsed_model() -> LogisticRegressionAdapter {
        LogisticRegressionAdapter::binary([0.0; FEATURE_COUNT], -0.619).expect("valid model")
    }

    /// A wide probe batch so a healthy model is never misread as collapsed.
    fn wide_probe() -> ProbeSettings {
        ProbeSettings {
            diagnostic: DegeneracyDiagnostic::with_batch_size(200).expect("valid batch"),
            seed: DEFAULT_PROBE_SEED,
        }
    }

    fn ready_service(model: LogisticRegressionAdapter) -> Service {
        let mut service = Service::new(DecisionPolicy::default(), wide_probe());
        service.load_scaler(scaler());
        service.load_model(model).expect("load model");
        service
    }

    fn form_for(features: &FeatureVector) -> HashMap<String, String> {
        FEATURE_NAMES
            .iter()
            .zip(features.as_array())
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_not_ready_until_both_artifacts_load() {
        let mut service = Service::new(DecisionPolicy::default(), ProbeSettings::default());
        assert!(!service.is_ready());
        assert!(!service.degeneracy_flag());

        let features = fixtures::normal_patient();
        assert!(matches!(
            service.predict_features(&features),
            Err(HepaticaError::ScalerNotLoaded)
        ));

        service.load_scaler(scaler());
        assert!(!service.is_ready());
        assert!(matches!(
            service.predict_features(&features),
            Err(HepaticaError::ModelNotLoaded)
        ));

        service.load_model(healthy_model()).expect("load model");
        assert!(service.is_ready());
    }

    #[test]
    fn test_schema_errors_come_before_load_errors() {
        let service = Service::new(DecisionPolicy::default(), ProbeSettings::default());
        let mut form = form_for(&fixtures::normal_patient());
        form.remove("Bilirubin");

        let err = service.predict(&form).expect_err("must fail");
        assert!(matches!(
            err,
            HepaticaError::Schema(SchemaError::MissingField(ref f)) if f == "Bilirubin"
        ));
    }

    #[test]
    fn test_normal_patient_under_normal_policy() {
        let service = ready_service(healthy_model());
        assert!(!service.degeneracy_flag());

        let result = service
            .predict(&form_for(&fixtures::normal_patient()))
            .expect("predict");

        assert!(result.probabilities.positive() < 0.3);
        assert_eq!(result.raw_class, ClassLabel::Negative);
        assert_eq!(result.corrected_class, ClassLabel::Negative);
        assert!(!result.degenerate);
        let sum = result.probabilities.negative() + result.probabilities.positive();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_extreme_patient_under_normal_policy() {
        let service = ready_service(healthy_model());

        let result = service
            .predict_features(&fixtures::extreme_patient())
            .expect("predict");
        assert_eq!(result.raw_class, ClassLabel::Positive);
        assert_eq!(result.corrected_class, ClassLabel::Positive);
        assert!(result.probabilities.positive() > 0.99);
    }

    #[test]
    fn test_collapsed_model_is_flagged_and_corrected() {
        let service = ready_service(collapsed_model());
        assert!(service.degeneracy_flag());
        let report = service.diagnostic_report().expect("report");
        assert_eq!(report.constant_class, Some(ClassLabel::Negative));

        let result = service
            .predict_features(&fixtures::extreme_patient())
            .expect("predict");
        assert!((result.probabilities.positive() - 0.35).abs() < 1e-3);
        assert_eq!(result.raw_class, ClassLabel::Negative);
        assert_eq!(result.corrected_class, ClassLabel::Positive);
        assert!(result.degenerate);
        assert_eq!(result.message, DEFAULT_DEGENERATE_MESSAGE);
        assert!((result.confidence - result.probabilities.negative()).abs() < 1e-12);
    }

    #[test]
    fn test_custom_threshold_flows_into_decisions() {
        let mut service = Service::new(
            DecisionPolicy::with_threshold(0.4).expect("valid"),
            ProbeSettings::default(),
        );
        service.load_scaler(scaler());
        service.load_model(collapsed_model()).expect("load model");

        let result = service
            .predict_features(&fixtures::extreme_patient())
            .expect("predict");
        assert_eq!(result.corrected_class, ClassLabel::Negative);
    }

    #[test]
    fn test_scoring_failure_is_reported() {
        let service = ready_service(healthy_model());
        let mut values = *fixtures::normal_patient().as_array();
        values[BILIRUBIN] = 1e308;
        values[ALBUMIN] = -1e308;
        let features = FeatureVector::from_ordered(values).expect("finite");

        let err = service.predict_features(&features).expect_err("must fail");
        assert!(matches!(
            err,
            HepaticaError::ScoringFailure(ScoringError::NonFiniteLogit { .. })
        ));
    }

    #[test]
    fn test_feature_names_are_the_schema() {
        let service = Service::new(DecisionPolicy::default(), ProbeSettings::default());
        assert_eq!(service.feature_names(), FEATURE_NAMES);
        assert_eq!(service.feature_names().len(), 21);
    }
}
