//! Site Recommender - Main Entry Point
//!
//! Loads the trained model pipeline once at startup and serves the
//! prediction API plus the static map front end.

use anyhow::Result;
use site_recommender::{
    config::AppConfig,
    metrics::{MetricsReporter, ServiceMetrics},
    predictor::PredictionService,
    server,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_recommender=info".parse()?),
        )
        .init();

    info!("Starting Site Recommender");

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        artifact = %config.model.artifact_path,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());

    // Load the model pipeline and build the prediction service
    let service = Arc::new(PredictionService::new(&config, metrics.clone())?);
    info!("Prediction service initialized");

    // Start the periodic metrics reporter
    let metrics_clone = metrics.clone();
    let interval = config.server.metrics_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, interval);
        reporter.start().await;
    });

    // Serve until stopped
    server::run(&config.server, service).await?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
