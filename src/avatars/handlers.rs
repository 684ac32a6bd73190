use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{instrument, warn};

use super::services::{ingest_avatar, UploadItem, AVATAR_FIELD};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    users::PublicUser,
};

// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub avatar: String,
}

pub fn avatar_routes(max_avatar_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload-avatar", post(upload_avatar))
        .layer(DefaultBodyLimit::max(max_avatar_bytes + MULTIPART_OVERHEAD))
}

/// POST /upload-avatar (multipart, field `avatar`)
#[instrument(skip(state, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<AvatarResponse>> {
    let max_bytes = state.config.uploads.max_avatar_bytes;
    let multipart_err = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::FileTooLarge { max_bytes }
        } else {
            warn!(error = %e, "malformed multipart body");
            AppError::Validation("Malformed multipart body".into())
        }
    };

    let mut upload = None;
    while let Some(field) = mp.next_field().await.map_err(&multipart_err)? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let body = field.bytes().await.map_err(&multipart_err)?;
        upload = Some(UploadItem { file_name, body });
        break;
    }

    let (avatar, user) = ingest_avatar(&state, user_id, upload).await?;
    Ok(Json(AvatarResponse {
        message: "Avatar uploaded",
        user: user.into(),
        avatar,
    }))
}
