use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
};
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::mask_key,
    error::{AppError, INVALID_JSON, INVALID_REQUEST},
    message::{ChatRequest, ChatResponse},
    services::{
        generator::{GenerationError, GenerationRequest},
        prompt::seed_history,
    },
    state::SharedState,
};

const PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

/// POST /api/chat/ relays one message to the generation service.
pub async fn chat_handler(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let span = info_span!("chat", request_id = %Uuid::new_v4());
    let body = body.map_err(|rejection| {
        span.in_scope(|| {
            warn!(status = %rejection.status(), reason = %rejection.body_text(), "chat body not readable");
        });
        AppError::UnreadableBody(rejection.status())
    })?;
    relay(state, body).instrument(span).await
}

async fn relay(state: SharedState, body: Bytes) -> Result<Json<ChatResponse>, AppError> {
    let payload: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "rejecting unparseable chat body");
        AppError::BadRequest(INVALID_JSON.to_string())
    })?;

    let Some(api_key) = state.config.gemini_api_key.as_deref() else {
        error!("GEMINI_API_KEY not found in configuration");
        return Err(AppError::MissingCredential);
    };
    debug!(key = %mask_key(api_key), "API key found");
    info!(preview = %preview(&payload.message), "user message");

    let history = seed_history();
    let request = GenerationRequest {
        api_key,
        model: &state.config.model,
        history: &history,
        message: &payload.message,
    };

    let limit = state.config.request_timeout;
    let expose = state.config.expose_error_detail;
    let Some(deadline) = Instant::now().checked_add(limit) else {
        error!(?limit, "request timeout out of range");
        return Err(AppError::generation(GenerationError::Timeout(limit), expose));
    };

    let _permit = match timeout_at(deadline, state.permits.acquire()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_closed)) => {
            error!("relay permits closed");
            return Err(AppError::generation(GenerationError::Unavailable, expose));
        }
        Err(_elapsed) => {
            warn!("no relay permit available before deadline");
            return Err(AppError::generation(GenerationError::Busy, expose));
        }
    };

    let outcome = match timeout_at(deadline, state.generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(limit)),
    };

    match outcome {
        Ok(reply) => {
            info!(reply = %preview(&reply), "response received");
            Ok(Json(ChatResponse { response: reply }))
        }
        Err(err) => {
            error!(error = %err, "chat relay failed");
            Err(AppError::generation(err, expose))
        }
    }
}

/// Any method other than POST on the chat route.
pub async fn invalid_method_handler() -> AppError {
    AppError::BadRequest(INVALID_REQUEST.to_string())
}
