use aquasense_backend::services::gemini::GeminiClient;
use aquasense_backend::services::generator::{GenerationError, GenerationRequest, TextGenerator};
use aquasense_backend::services::prompt::seed_history;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Hits = Arc<AtomicUsize>;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/v1beta", addr)
}

async fn generate_ok(
    State(hits): State<Hits>,
    Path(action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    assert_eq!(action, "gemini-2.0-flash:generateContent");
    assert_eq!(query.get("key").map(String::as_str), Some("stub-key"));

    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[1]["role"], "model");
    let question = contents[2]["parts"][0]["text"].as_str().unwrap().to_string();

    Json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": format!("You asked: {question}") }] },
            "finishReason": "STOP"
        }]
    }))
}

async fn generate_quota_exceeded(State(hits): State<Hits>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
        })),
    )
}

fn client(base: String) -> GeminiClient {
    GeminiClient::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let hits: Hits = Arc::default();
    let router = Router::new()
        .route("/v1beta/models/{action}", post(generate_ok))
        .with_state(hits.clone());
    let base = spawn_stub(router).await;

    let history = seed_history();
    let reply = client(base)
        .generate(GenerationRequest {
            api_key: "stub-key",
            model: "gemini-2.0-flash",
            history: &history,
            message: "Do you teach wreck diving?",
        })
        .await
        .unwrap();

    assert_eq!(reply, "You asked: Do you teach wreck diving?");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let hits: Hits = Arc::default();
    let router = Router::new()
        .route("/v1beta/models/{action}", post(generate_quota_exceeded))
        .with_state(hits.clone());
    let base = spawn_stub(router).await;

    let history = seed_history();
    let err = client(base)
        .generate(GenerationRequest {
            api_key: "stub-key",
            model: "gemini-2.0-flash",
            history: &history,
            message: "hello",
        })
        .await
        .unwrap_err();

    match err {
        GenerationError::RateLimited(msg) => assert_eq!(msg, "Resource has been exhausted"),
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind then drop so the port refuses connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let history = seed_history();
    let err = client(format!("http://{}/v1beta", addr))
        .generate(GenerationRequest {
            api_key: "stub-key",
            model: "gemini-2.0-flash",
            history: &history,
            message: "hello",
        })
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_list_models_follows_pages() {
    async fn list(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(query.get("key").map(String::as_str), Some("stub-key"));
        match query.get("pageToken").map(String::as_str) {
            None => Json(json!({
                "models": [
                    { "name": "models/gemini-2.0-flash", "supportedGenerationMethods": ["generateContent", "countTokens"] },
                    { "name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"] }
                ],
                "nextPageToken": "page-2"
            })),
            Some("page-2") => Json(json!({
                "models": [
                    { "name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"] }
                ]
            })),
            Some(other) => panic!("unexpected page token {other}"),
        }
    }

    let base = spawn_stub(Router::new().route("/v1beta/models", get(list))).await;

    let models = client(base).list_models("stub-key").await.unwrap();
    assert_eq!(models.len(), 3);

    let chat_models: Vec<&str> = models
        .iter()
        .filter(|m| m.supports_generate_content())
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(chat_models, vec!["models/gemini-2.0-flash", "models/gemini-1.5-pro"]);
}

async fn answer_after_hit(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Welcome aboard" }] } }]
    }))
}

async fn ask(client: &GeminiClient) -> Result<String, GenerationError> {
    let history = seed_history();
    client
        .generate(GenerationRequest {
            api_key: "stub-key",
            model: "gemini-2.0-flash",
            history: &history,
            message: "hello",
        })
        .await
}

#[tokio::test]
async fn test_dropped_connection_is_retried_once() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dropped: Hits = Arc::default();
    let hits: Hits = Arc::default();
    let router = Router::new()
        .route("/v1beta/models/{action}", post(answer_after_hit))
        .with_state(hits.clone());

    // First connection is closed without a response, the rest are served.
    let counter = dropped.clone();
    tokio::spawn(async move {
        let (first, _) = listener.accept().await.unwrap();
        counter.fetch_add(1, Ordering::SeqCst);
        drop(first);
        axum::serve(listener, router).await.unwrap();
    });

    let reply = ask(&client(format!("http://{}/v1beta", addr))).await.unwrap();

    assert_eq!(reply, "Welcome aboard");
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gives_up_after_second_dropped_connection() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted: Hits = Arc::default();

    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            let (conn, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            drop(conn);
        }
    });

    let err = ask(&client(format!("http://{}/v1beta", addr))).await.unwrap_err();

    assert!(matches!(err, GenerationError::Transport(_)), "got {err:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_attempt_timeout_is_retried() {
    async fn slow_first(State(hits): State<Hits>) -> Json<Value> {
        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        Json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "second try" }] } }]
        }))
    }

    let hits: Hits = Arc::default();
    let router = Router::new()
        .route("/v1beta/models/{action}", post(slow_first))
        .with_state(hits.clone());
    let base = spawn_stub(router).await;

    let client = GeminiClient::new(base, Duration::from_millis(300)).unwrap();
    let reply = ask(&client).await.unwrap();

    assert_eq!(reply, "second try");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
