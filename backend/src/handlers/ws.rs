use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::{Json, Response},
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::{AuthenticatedUser, SessionUser};
use crate::services::{InboundHandler, run_session};
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: SessionUser,
) -> Response {
    let handler: Arc<dyn InboundHandler> = Arc::new(state.chat.clone());
    let hub = state.hub.clone();
    let config = state.session.clone();

    // tungstenite refuses oversized frames while reading; the session loop
    // still checks the decoded size
    ws.max_frame_size(config.max_frame_bytes)
        .max_message_size(config.max_frame_bytes)
        .on_upgrade(move |socket| run_session(socket, hub, user.identity, config, handler))
}

pub async fn presence(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Json<Value> {
    Json(json!({
        "user_id": user_id,
        "online": state.hub.is_online(user_id),
    }))
}
