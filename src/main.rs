use std::sync::Arc;

use anyhow::Context;
use aquasense_backend::{
    config::Config, routes, services::gemini::GeminiClient, state::AppState,
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aquasense_backend=debug".into()),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail until it is");
    }
    tracing::debug!(?config, "loaded configuration");

    let client = GeminiClient::for_deadline(config.api_base.clone(), config.request_timeout)
        .context("failed to build HTTP client")?;

    let bind_addr = config.bind_addr.clone();
    let static_dir = config.static_dir.clone();
    let state = Arc::new(AppState::new(config, Arc::new(client)));

    let app = routes::create_router(&static_dir)
        .with_state(state)
        .layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("AquaSense backend running at http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
