use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use super::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{Conversation, Message, MessagePage, SendMessageRequest};
use crate::state::AppState;

pub async fn get_conversations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(state.chat.conversations(user.identity).await?))
}

pub async fn get_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<Uuid>,
    Query(page): Query<MessagePage>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.chat.list_messages(user.identity, match_id, &page).await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = state
        .chat
        .send_message(user.identity, match_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let marked = state.chat.mark_read(user.identity, match_id).await?;
    Ok(Json(json!({ "marked_read": marked })))
}
