//! Offline probe for a fitted hepatitis model.
//!
//! Loads the scaler and model artifacts, prints the model shape, scores two
//! reference patients and runs the degeneracy diagnostic. Use it to inspect a
//! model before deploying it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin probe_model -- [--model <path>] [--scaler <path>] [--seed <n>]
//! ```
//!
//! Paths and seed fall back to the same `HEPATICA_*` variables as the server.

use anyhow::{Context, Result};

use hepatica::adapters::{LogisticRegressionAdapter, StandardScalerAdapter};
use hepatica::config::AppConfig;
use hepatica::domain::{fixtures, FeatureVector};
use hepatica::ports::{FeatureScaler, ProbabilisticClassifier};

/// A gap this wide between the class probabilities on a reference patient
/// suggests the model is saturated.
const IMBALANCE_ALERT_GAP: f64 = 0.8;

fn usage() -> &'static str {
    "Usage: probe_model [--model <path>] [--scaler <path>] [--seed <n>]"
}

fn score(
    label: &str,
    features: &FeatureVector,
    scaler: &StandardScalerAdapter,
    model: &LogisticRegressionAdapter,
) -> Result<()> {
    let scaled = scaler.transform(features)?;
    let probabilities = model.predict_proba(&scaled)?;
    let class = probabilities.argmax();

    println!("{label}:");
    println!("  prediction:    {} ({})", class.as_u8(), class);
    println!(
        "  probabilities: [{:.6}, {:.6}]",
        probabilities.negative(),
        probabilities.positive()
    );

    let gap = (probabilities.negative() - probabilities.positive()).abs();
    if gap > IMBALANCE_ALERT_GAP {
        println!(
            "  ALERT: probability gap {gap:.3} exceeds {IMBALANCE_ALERT_GAP}; \
             the model may be saturated"
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", usage());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = AppConfig::from_env_and_args(&args)?;
    for warning in &config.warnings {
        eprintln!("warning: {warning}");
    }

    let scaler = StandardScalerAdapter::load(&config.scaler_path, config.artifacts)
        .with_context(|| format!("loading scaler from {}", config.scaler_path.display()))?;
    let model = LogisticRegressionAdapter::load(&config.model_path, config.artifacts)
        .with_context(|| format!("loading model from {}", config.model_path.display()))?;

    println!("=== Model ===");
    let summary = model.summary();
    println!("classes:     {:?}", summary.classes);
    println!("coef shape:  {:?}", summary.coef_shape);
    println!("intercept:   {:?}", summary.intercept);
    for info in [model.artifact_info(), scaler.artifact_info()].into_iter().flatten() {
        println!(
            "artifact:    {} sha256={} manifest={}",
            info.path.display(),
            info.sha256,
            info.manifest_verified
        );
    }

    println!();
    println!("=== Reference patients ===");
    score("normal patient", &fixtures::normal_patient(), &scaler, &model)?;
    score("extreme hepatitis patient", &fixtures::extreme_patient(), &scaler, &model)?;

    println!();
    println!("=== Degeneracy diagnostic ===");
    let probe = config.probe_settings()?;
    let report = probe.diagnostic.diagnose(&model, probe.seed)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.is_degenerate() {
        println!(
            "Model is degenerate: the service will apply the positive-class threshold override."
        );
    } else {
        println!("Model predictions vary across probes.");
    }

    Ok(())
}
