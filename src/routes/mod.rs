//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one quiz session per connection)
/// - JSON API under `/api/v1/...` for the three views: guidelines, code checker, arcade
/// - Static frontend from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/guidelines", get(http::http_get_guidelines))
        .route("/api/v1/evaluate", post(http::http_post_evaluate))
        .route("/api/v1/shop", get(http::http_get_shop))
        .route("/api/v1/quiz/sessions", post(http::http_create_session))
        .route(
            "/api/v1/quiz/sessions/:id",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .route("/api/v1/quiz/sessions/:id/start", post(http::http_post_start))
        .route("/api/v1/quiz/sessions/:id/answer", post(http::http_post_answer))
        .route("/api/v1/quiz/sessions/:id/advance", post(http::http_post_advance))
        .route("/api/v1/quiz/sessions/:id/purchase", post(http::http_post_purchase))
        .route("/api/v1/quiz/sessions/:id/cosmetic", post(http::http_post_select_cosmetic))
        .route("/api/v1/quiz/sessions/:id/fifty_fifty", post(http::http_post_fifty_fifty))
        .route("/api/v1/quiz/sessions/:id/hint", post(http::http_post_hint))
        .route("/api/v1/quiz/sessions/:id/skip", post(http::http_post_skip))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
