//! Prints the Gemini models that accept `generateContent` for the configured key.

use anyhow::{Context, bail};
use aquasense_backend::{config::Config, services::gemini::GeminiClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let Some(api_key) = config.gemini_api_key.as_deref() else {
        bail!("GEMINI_API_KEY is not set");
    };

    let client = GeminiClient::for_deadline(config.api_base.clone(), config.request_timeout)?;

    println!("Listing available models...");
    let models = client.list_models(api_key).await.context("failed to list models")?;
    for model in models.iter().filter(|m| m.supports_generate_content()) {
        println!("{}", model.name);
    }
    Ok(())
}
