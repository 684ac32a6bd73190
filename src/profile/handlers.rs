use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use super::{
    dto::{ChangePasswordRequest, MessageResponse},
    services::{change_password, load_profile, update_profile},
};
use crate::{auth::AuthUser, error::AppResult, state::AppState, users::PublicUser};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/update", put(update))
        .route("/change-password", put(put_change_password))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = load_profile(&state, user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<Value>,
) -> AppResult<Json<PublicUser>> {
    let user = update_profile(&state, user_id, &payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn put_change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    change_password(&state, user_id, payload.old_password, payload.new_password).await?;
    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}
