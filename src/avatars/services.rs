use anyhow::Context;
use bytes::Bytes;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{ProfilePatch, StoreError, User},
};

pub const AVATAR_FIELD: &str = "avatar";
const AVATAR_PREFIX: &str = "avatars";
const PUBLIC_PREFIX: &str = "/uploads";
const MAX_BASE_LEN: usize = 64;

pub struct UploadItem {
    pub file_name: String,
    pub body: Bytes,
}

/// Lowercased extension of `file_name` if it is an allowed image type.
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = base_name(file_name).rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("png"),
        "jpg" => Some("jpg"),
        "jpeg" => Some("jpeg"),
        "webp" => Some("webp"),
        _ => None,
    }
}

fn mime_from_ext(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

// Last path component, whichever separator the client used.
fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name)
}

fn sanitize_stem(file_name: &str) -> String {
    lazy_static! {
        static ref UNSAFE_RUN: Regex = Regex::new(r"[^A-Za-z0-9_-]+").unwrap();
    }
    let name = base_name(file_name);
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    let cleaned = UNSAFE_RUN.replace_all(stem, "-");
    let trimmed: String = cleaned
        .trim_matches('-')
        .chars()
        .take(MAX_BASE_LEN)
        .collect();
    if trimmed.is_empty() {
        "avatar".to_string()
    } else {
        trimmed
    }
}

/// `<stem>-<unix millis>-<random>.<ext>`
pub fn generate_file_name(original: &str, ext: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}-{}.{}", sanitize_stem(original), millis, suffix, ext)
}

pub async fn ingest_avatar(
    st: &AppState,
    user_id: Uuid,
    upload: Option<UploadItem>,
) -> AppResult<(String, User)> {
    let upload = upload.ok_or(AppError::NoFileProvided)?;

    let ext = allowed_extension(&upload.file_name).ok_or_else(|| {
        warn!(%user_id, file_name = %upload.file_name, "rejected avatar type");
        AppError::UnsupportedFileType
    })?;

    let max_bytes = st.config.uploads.max_avatar_bytes;
    if upload.body.len() > max_bytes {
        return Err(AppError::FileTooLarge { max_bytes });
    }

    let file_name = generate_file_name(&upload.file_name, ext);
    let key = format!("{AVATAR_PREFIX}/{file_name}");
    st.storage
        .put_object(&key, upload.body, mime_from_ext(ext))
        .await
        .with_context(|| format!("store avatar {key}"))?;

    let avatar_url = format!("{PUBLIC_PREFIX}/{key}");
    let user = match st
        .users
        .update_fields(user_id, &ProfilePatch::avatar(avatar_url.clone()))
        .await
    {
        Ok(u) => u,
        Err(e) => {
            if matches!(e, StoreError::NotFound) {
                if let Err(del) = st.storage.delete_object(&key).await {
                    warn!(error = %del, key = %key, "orphaned avatar not removed");
                }
            }
            return Err(e.into());
        }
    };

    info!(%user_id, avatar = %avatar_url, "avatar uploaded");
    Ok((avatar_url, user))
}
