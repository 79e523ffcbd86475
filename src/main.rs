use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

mod config;
mod llm;
mod locales;
mod server;
mod utils;
mod watermark;

use config::Config;
use llm::gemini::GeminiClient;
use llm::orchestrator::Orchestrator;
use server::AppState;
use utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config.log_level);

    info!(
        "Starting AI Fashion Studio relay (model={}, watermark={})",
        config.gemini_image_model, config.watermark_enabled
    );

    let client = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_image_model.clone(),
        config.request_timeout_secs,
    );
    let state = AppState {
        model: client.model().to_string(),
        orchestrator: Arc::new(Orchestrator::new(client)),
        watermark_enabled: config.watermark_enabled,
    };

    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}
