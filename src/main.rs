use anyhow::Context;
use clap::Parser;
use maintenance_predictor::{
    api::{build_router, AppState},
    config::Config,
    metrics,
    ml::PredictionService,
    observability,
    recommendations::build_advisor,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "maintenance-predictor")]
#[command(about = "Machine maintenance prediction server", version, long_about = None)]
struct Args {
    /// Configuration file (overrides MP_CONFIG_PATH)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    observability::init_tracing(&config.observability)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!(
        "Starting Machine Maintenance Predictor v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Load the model artifact; the server does not start without it
    let service = PredictionService::load(
        &config.model.artifact_path,
        config.model.schema.as_ref(),
        config.training.healthy_labels.clone(),
    )
    .with_context(|| {
        format!(
            "Failed to load model from {} (run `mp-cli train` first)",
            config.model.artifact_path.display()
        )
    })?;
    metrics::set_build_info(&service.metadata().model_type.to_string());

    let advisor = build_advisor(&config.recommendations)
        .context("Failed to initialize recommendation advisor")?;
    tracing::info!("✅ Recommendation advisor '{}' initialized", advisor.name());

    let app = build_router(AppState::new(Arc::new(service), advisor));

    // Start HTTP server
    let http_addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;

    tracing::info!("🚀 HTTP server listening on http://{}", http_addr);
    tracing::info!("   Prediction form: http://{}/", http_addr);
    tracing::info!("   JSON API: http://{}/v1/predict", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
