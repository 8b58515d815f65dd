// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::message::ErrorResponse;
use crate::services::generator::GenerationError;

pub const INVALID_REQUEST: &str = "Invalid request";
pub const INVALID_JSON: &str = "Invalid JSON body";
pub const BODY_TOO_LARGE: &str = "Request body too large";
pub const UNREADABLE_BODY: &str = "Could not read request body";
pub const MISSING_CREDENTIAL: &str = "API key not configured. Please contact support.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request body rejected with {0}")]
    UnreadableBody(StatusCode),
    #[error("GEMINI_API_KEY is not configured")]
    MissingCredential,
    #[error("chat service error: {source}")]
    Generation {
        source: GenerationError,
        expose_detail: bool,
    },
}

impl AppError {
    pub fn generation(source: GenerationError, expose_detail: bool) -> Self {
        AppError::Generation { source, expose_detail }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnreadableBody(status) => *status,
            AppError::MissingCredential | AppError::Generation { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text placed in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::UnreadableBody(status) if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                BODY_TOO_LARGE.to_string()
            }
            AppError::UnreadableBody(_) => UNREADABLE_BODY.to_string(),
            AppError::MissingCredential => MISSING_CREDENTIAL.to_string(),
            AppError::Generation { source, expose_detail: true } => {
                format!("Chat service error: {source}")
            }
            AppError::Generation { source, expose_detail: false } => sanitized(source).to_string(),
        }
    }
}

fn sanitized(err: &GenerationError) -> &'static str {
    match err {
        GenerationError::Timeout(_) => "The chat service took too long to respond. Please try again.",
        GenerationError::RateLimited(_) => "The chat service is busy right now. Please try again shortly.",
        GenerationError::Busy => "Too many conversations in progress. Please try again shortly.",
        GenerationError::Unavailable => "The chat service is not accepting messages right now.",
        GenerationError::Transport(_) => "The chat service is unreachable. Please try again later.",
        GenerationError::Api { .. } | GenerationError::MalformedResponse(_) => {
            "The chat service could not answer. Please try again later."
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse { error: self.public_message() };
        (self.status(), Json(body)).into_response()
    }
}
