use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::constants::API_PREFIX;
use crate::handlers::{chat, matches, swipes, ws};
use crate::state::AppState;

pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/swipes", post(swipes::create_swipe))
        .route("/swipes/history", get(swipes::swipe_history))
        .route("/matches", get(matches::list_matches))
        .route(
            "/matches/{id}",
            get(matches::get_match).delete(matches::unmatch),
        )
        .route("/matches/{id}/status", put(matches::update_application_status))
        .route("/chat/conversations", get(chat::get_conversations))
        .route(
            "/chat/{match_id}/messages",
            get(chat::get_messages).post(chat::send_message),
        )
        .route("/chat/{match_id}/read", put(chat::mark_read))
        .route("/presence/{user_id}", get(ws::presence))
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, api_routes)
        .layer(create_cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        // Default to permissive for development
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

async fn health_check() -> &'static str {
    "OK"
}
