//! HTTP surface: form page, JSON API, health, features and diagnostic.

pub mod page;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::adapters::{ArtifactInfo, LogisticRegressionAdapter, StandardScalerAdapter};
use crate::application::DiagnosticReport;
use crate::domain::{fixtures, PredictionResult, FEATURE_COUNT};
use crate::{HepaticaError, PredictionService};

use page::Outcome;

/// The service wired to the concrete artifact adapters.
pub type HepatitisService = PredictionService<StandardScalerAdapter, LogisticRegressionAdapter>;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<HepatitisService>,
}

impl AppState {
    #[must_use]
    pub fn new(service: HepatitisService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    #[must_use]
    pub fn service(&self) -> &HepatitisService {
        &self.service
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_api))
        .route("/health", get(health))
        .route("/features", get(features))
        .route("/diagnostic", get(diagnostic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: error.into(),
            field: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictionBody {
    status: &'static str,
    prediction: u8,
    prediction_original: u8,
    class: &'static str,
    class_original: &'static str,
    probability_positive: f64,
    probability_negative: f64,
    confidence: f64,
    problem_detected: bool,
    message: String,
    timestamp: String,
}

impl From<PredictionResult> for PredictionBody {
    fn from(result: PredictionResult) -> Self {
        Self {
            status: "success",
            prediction: result.corrected_class.as_u8(),
            prediction_original: result.raw_class.as_u8(),
            class: result.corrected_class.display_name(),
            class_original: result.raw_class.display_name(),
            probability_positive: result.probabilities.positive(),
            probability_negative: result.probabilities.negative(),
            confidence: result.confidence,
            problem_detected: result.degenerate,
            message: result.message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    message: &'static str,
    model_loaded: bool,
    scaler_loaded: bool,
    problem_detected: bool,
}

#[derive(Debug, Serialize)]
struct FeaturesBody {
    features: [&'static str; FEATURE_COUNT],
    count: usize,
}

#[derive(Debug, Serialize)]
struct ArtifactsBody<'a> {
    model: Option<&'a ArtifactInfo>,
    scaler: Option<&'a ArtifactInfo>,
}

#[derive(Debug, Serialize)]
struct DiagnosticBody<'a> {
    model_status: &'static str,
    problem_detected: bool,
    diagnostic: Option<&'a DiagnosticReport>,
    test_prediction: PredictionBody,
    features_count: usize,
    artifacts: ArtifactsBody<'a>,
    message: &'static str,
}

fn status_for(err: &HepaticaError) -> StatusCode {
    match err {
        HepaticaError::Schema(_) => StatusCode::BAD_REQUEST,
        HepaticaError::ScalerNotLoaded | HepaticaError::ModelNotLoaded => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_failure(err: &HepaticaError) {
    match err {
        HepaticaError::Schema(_)
        | HepaticaError::ScalerNotLoaded
        | HepaticaError::ModelNotLoaded => tracing::warn!("Prediction rejected: {err}"),
        _ => tracing::error!("Prediction failed: {err}"),
    }
}

fn error_response(err: &HepaticaError) -> Response {
    let mut body = ErrorBody::new(err.to_string());
    if let HepaticaError::Schema(schema) = err {
        body.field = Some(schema.field().to_string());
    }
    (status_for(err), Json(body)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn index() -> Html<String> {
    Html(page::render(&HashMap::new(), None))
}

async fn predict_form(
    State(state): State<AppState>,
    Form(values): Form<HashMap<String, String>>,
) -> Response {
    tracing::info!("Received form prediction request");

    match state.service.predict(&values) {
        Ok(result) => {
            Html(page::render(&values, Some(Outcome::Prediction(&result)))).into_response()
        }
        Err(err) => {
            log_failure(&err);
            let message = err.to_string();
            (
                status_for(&err),
                Html(page::render(&values, Some(Outcome::Error(&message)))),
            )
                .into_response()
        }
    }
}

async fn predict_api(State(state): State<AppState>, body: Bytes) -> Response {
    tracing::info!("Received API prediction request");

    let payload = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new("Request body must be a JSON object")),
            )
                .into_response()
        }
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(format!("Malformed JSON: {e}"))),
            )
                .into_response()
        }
    };

    match state.service.predict(&payload) {
        Ok(result) => Json(PredictionBody::from(result)).into_response(),
        Err(err) => {
            log_failure(&err);
            error_response(&err)
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let service = &state.service;
    Json(HealthBody {
        status: "OK",
        message: "Hepatitis API running",
        model_loaded: service.is_model_loaded(),
        scaler_loaded: service.is_scaler_loaded(),
        problem_detected: service.degeneracy_flag(),
    })
}

async fn features(State(state): State<AppState>) -> Json<FeaturesBody> {
    let features = state.service.feature_names();
    Json(FeaturesBody {
        count: features.len(),
        features,
    })
}

async fn diagnostic(State(state): State<AppState>) -> Response {
    let service = &state.service;

    let result = match service.predict_features(&fixtures::reference_patient()) {
        Ok(result) => result,
        Err(err) => {
            log_failure(&err);
            return error_response(&err);
        }
    };

    Json(DiagnosticBody {
        model_status: "loaded",
        problem_detected: service.degeneracy_flag(),
        diagnostic: service.diagnostic_report(),
        test_prediction: PredictionBody::from(result),
        features_count: FEATURE_COUNT,
        artifacts: ArtifactsBody {
            model: service.model().and_then(LogisticRegressionAdapter::artifact_info),
            scaler: service.scaler().and_then(StandardScalerAdapter::artifact_info),
        },
        message: "Model diagnosed successfully",
    })
    .into_response()
}
