use axum::{extract::State, response::Json};

use super::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{Swipe, SwipeOutcome, SwipeRequest};
use crate::state::AppState;

pub async fn create_swipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<SwipeRequest>,
) -> Result<Json<SwipeOutcome>, AppError> {
    let outcome = state
        .engine
        .swipe(user.identity, req.target_id, req.category, req.direction)
        .await?;
    Ok(Json(outcome))
}

pub async fn swipe_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Swipe>>, AppError> {
    let swipes = state.engine.swipe_history(user.identity.user_id).await?;
    Ok(Json(swipes))
}
