// src/routes/mod.rs
pub mod chat;

use crate::state::SharedState;
use axum::{
    Router,
    routing::{get, post},
};
use chat::{chat_handler, invalid_method_handler};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_router(static_dir: &str) -> Router<SharedState> {
    let chat_route = post(chat_handler).fallback(invalid_method_handler);

    Router::new()
        .route("/api/chat/", chat_route.clone())
        .route("/api/chat", chat_route)
        .route("/health", get(|| async { "OK" }))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}
