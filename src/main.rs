mod config;
mod export;
mod gemini;
mod models;
mod orchestrator;
mod persistence;
mod prompts;
mod routes;
mod schema;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::export::DocumentExporter;
use crate::gemini::GeminiClient;
use crate::orchestrator::Controller;
use crate::persistence::JsonFileStore;
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every generation will fail until it is");
    }
    tracing::info!("Using API key: {} with model {}", config.masked_key(), config.model);

    let controller = Controller::new(
        Arc::new(GeminiClient::new(&config)),
        Arc::new(JsonFileStore::new(&config.form_path)),
        config.default_language,
    );
    let state = AppState {
        controller: Arc::new(controller),
        exporter: Arc::new(DocumentExporter),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting server");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
