// src/services/generator.rs
use async_trait::async_trait;
use thiserror::Error;

use super::prompt::Turn;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),
    #[error("upstream returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("too many chat requests in flight")]
    Busy,
    #[error("relay is shutting down")]
    Unavailable,
}

impl GenerationError {
    /// Network-level failures worth one more attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transport(_))
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GenerationError::MalformedResponse(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

/// Everything the external service needs for one reply.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub history: &'a [Turn],
    pub message: &'a str,
}

/// Seam around the hosted text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, GenerationError>;
}
