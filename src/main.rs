use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signal_classifier::api;
use signal_classifier::config::{Config, EnvConfig};
use signal_classifier::SignalService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Signal classifier starting...");

    // Load configuration
    let env_config = EnvConfig::load()?;
    let config = Config::resolve(&env_config)?;

    // Model is loaded once, before the listener accepts anything
    tracing::info!("Model path: {}", config.scoring.model_path);
    let service = Arc::new(SignalService::from_config(&config.scoring));
    if !service.model_loaded() {
        tracing::warn!("⚠️ Running in fallback mode (rule-based scoring)");
    }

    let app = api::router(service);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("✅ Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
