use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use super::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{Match, MatchSummary, UpdateStatusRequest};
use crate::state::AppState;

pub async fn list_matches(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<MatchSummary>>, AppError> {
    Ok(Json(state.engine.matches(user.identity).await?))
}

pub async fn get_match(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(state.engine.match_for(match_id, user.identity.user_id).await?))
}

pub async fn update_application_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = state
        .engine
        .set_application_status(user.identity, match_id, req.application_status)
        .await?;
    Ok(Json(summary))
}

pub async fn unmatch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(state.engine.unmatch(match_id, user.identity.user_id).await?))
}
