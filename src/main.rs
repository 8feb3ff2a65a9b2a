//! Fraud Scoring Pipeline - Main Entry Point
//!
//! Loads the model artifacts, opens the transaction store and serves the
//! scoring API over HTTP.

use anyhow::{Context, Result};
use fraud_scoring_pipeline::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, PipelineMetrics},
    models::inference::ScoringEngine,
    pipeline::ScoringPipeline,
    server::{run_server, AppState},
    store::TransactionStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Scoring Pipeline");
    info!("Configuration loaded successfully");

    // Initialize scoring engine; missing artifacts degrade instead of failing
    let engine = ScoringEngine::load(&config.models);
    if !engine.is_ready() {
        info!(
            reason = engine.degraded_reason().unwrap_or_default(),
            "Serving Unknown verdicts; restart with model artifacts to score"
        );
    }

    let store = TransactionStore::open(&config.storage.database_path)
        .with_context(|| format!("Failed to open {}", config.storage.database_path))?;
    info!("Transaction store opened at {}", config.storage.database_path);

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = Arc::new(AppState::new(
        ScoringPipeline::new(engine),
        store,
        metrics.clone(),
    ));

    info!("Binding HTTP listener on {}", config.bind_addr());
    let result = run_server(&config.server, state).await;

    info!("Pipeline shutting down...");
    metrics.print_summary();

    result
}
