// src/services/gemini.rs
//! Client for the hosted Gemini `generateContent` API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::generator::{GenerationError, GenerationRequest, TextGenerator};
use super::prompt::{Role, Turn};

const RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_ATTEMPTS: u32 = 2;
const ERROR_BODY_PREVIEW: usize = 300;

#[derive(Debug, Serialize)]
pub struct GenerateContentBody<'a> {
    pub contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub role: Role,
    pub parts: Vec<OutPart<'a>>,
}

#[derive(Debug, Serialize)]
pub struct OutPart<'a> {
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<InPart>,
}

#[derive(Debug, Deserialize)]
struct InPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "supportedGenerationMethods", default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == "generateContent")
    }
}

/// Build the `contents` array: seed history first, the user's message last.
pub fn build_body<'a>(history: &'a [Turn], message: &'a str) -> GenerateContentBody<'a> {
    let mut contents: Vec<Content<'a>> = history
        .iter()
        .map(|turn| Content { role: turn.role, parts: vec![OutPart { text: &turn.content }] })
        .collect();
    contents.push(Content { role: Role::User, parts: vec![OutPart { text: message }] });
    GenerateContentBody { contents }
}

/// Join the text parts of the first candidate.
pub fn extract_text(raw: &str) -> Result<String, GenerationError> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)
        .map_err(|e| GenerationError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse("no candidates in response".into()))?;

    let parts = match candidate.content {
        Some(content) if !content.parts.is_empty() => content.parts,
        _ => {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(GenerationError::MalformedResponse(format!(
                "candidate has no content (finish reason: {reason})"
            )));
        }
    };

    Ok(parts.into_iter().filter_map(|p| p.text).collect())
}

fn error_from_status(status: reqwest::StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(ERROR_BODY_PREVIEW).collect());

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        GenerationError::RateLimited(message)
    } else {
        GenerationError::Api { status: status.as_u16(), message }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
}

/// Per-attempt HTTP timeout that leaves room for the retry inside `deadline`.
pub fn attempt_timeout(deadline: Duration) -> Duration {
    let budget = deadline.saturating_sub(RETRY_DELAY) / MAX_ATTEMPTS;
    if budget.is_zero() { deadline / MAX_ATTEMPTS } else { budget }
}

impl GeminiClient {
    /// `timeout` bounds each HTTP attempt, not the whole call.
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, api_base: api_base.into() })
    }

    /// Client whose attempts, retry delay included, fit inside `deadline`.
    pub fn for_deadline(api_base: impl Into<String>, deadline: Duration) -> reqwest::Result<Self> {
        Self::new(api_base, attempt_timeout(deadline))
    }

    async fn send_once(
        &self,
        url: &str,
        api_key: &str,
        body: &GenerateContentBody<'_>,
    ) -> Result<String, GenerationError> {
        let resp = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(error_from_status(status, &text));
        }
        extract_text(&text)
    }

    /// Every model visible to this key, following pagination.
    pub async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, GenerationError> {
        let url = format!("{}/models", self.api_base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.http.get(&url).query(&[("key", api_key)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let resp = req.send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            if !status.is_success() {
                return Err(error_from_status(status, &text));
            }

            let page: ListModelsResponse = serde_json::from_str(&text)
                .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
            models.extend(page.models);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, request.model);
        let body = build_body(request.history, request.message);

        let mut attempt = 1;
        loop {
            debug!(model = request.model, attempt, "sending message to Gemini");
            match self.send_once(&url, request.api_key, &body).await {
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(error = %err, "transient Gemini failure, retrying once");
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
