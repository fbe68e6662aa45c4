//! Hepatica: hepatitis risk prediction service.
//!
//! Main entry point for the HTTP server.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hepatica::adapters::sanitize::SanitizingMakeWriter;
use hepatica::adapters::{LogisticRegressionAdapter, StandardScalerAdapter};
use hepatica::config::{AppConfig, LogMode};
use hepatica::http::{self, AppState, HepatitisService};

fn init_logging(config: &AppConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Default behavior:
    // - interactive TTY: log to a file so the console stays readable
    // - non-interactive: log to stdout (so `docker logs` works)
    let use_file = match config.log_mode {
        LogMode::File => true,
        LogMode::Stdout => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}

/// Load both artifacts. Failures are logged and leave the service not ready.
fn build_service(config: &AppConfig) -> Result<HepatitisService> {
    let mut service = HepatitisService::new(config.policy()?, config.probe_settings()?);

    match StandardScalerAdapter::load(&config.scaler_path, config.artifacts) {
        Ok(scaler) => service.load_scaler(scaler),
        Err(e) => tracing::error!("Failed to load scaler: {e}"),
    }

    match LogisticRegressionAdapter::load(&config.model_path, config.artifacts) {
        Ok(model) => {
            if let Err(e) = service.load_model(model) {
                tracing::error!("Model rejected during diagnosis: {e}");
            }
        }
        Err(e) => tracing::error!("Failed to load model: {e}"),
    }

    if !service.is_ready() {
        tracing::warn!("Service is not ready; prediction requests will return 503");
    }
    Ok(service)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = AppConfig::from_env_and_args(&args)?;
    let _guard = init_logging(&config)?;

    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    tracing::info!("Starting Hepatica...");
    let service = build_service(&config)?;
    let app = http::router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Hepatica shutdown complete.");
    Ok(())
}
