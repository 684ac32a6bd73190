use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::reconcile::reconcile;
use crate::{
    auth::password::{check_password_policy, MIN_PASSWORD_LEN},
    error::{AppError, AppResult},
    state::AppState,
    users::{StoreError, User},
};

pub async fn load_profile(st: &AppState, user_id: Uuid) -> AppResult<User> {
    st.users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Field-level merge of `payload` into the stored account.
pub async fn update_profile(st: &AppState, user_id: Uuid, payload: &Value) -> AppResult<User> {
    let patch = reconcile(payload)?;

    if let Some(email) = &patch.email {
        if let Some(existing) = st.users.find_by_email(email).await? {
            if existing.id != user_id {
                warn!(%user_id, email = %email, "email already in use");
                return Err(AppError::EmailInUse);
            }
        }
    }

    // The store re-checks uniqueness on write; a lost race surfaces here.
    let user = st
        .users
        .update_fields(user_id, &patch)
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail => AppError::EmailInUse,
            other => other.into(),
        })?;

    info!(%user_id, "profile updated");
    Ok(user)
}

pub async fn change_password(
    st: &AppState,
    user_id: Uuid,
    old_password: Option<String>,
    new_password: Option<String>,
) -> AppResult<()> {
    let (Some(old_password), Some(new_password)) = (
        old_password.filter(|s| !s.is_empty()),
        new_password.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Old password and new password are required".into(),
        ));
    };

    if !check_password_policy(&new_password) {
        return Err(AppError::Validation(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = load_profile(st, user_id).await?;

    if !st.passwords.verify(&old_password, &user.password_hash) {
        warn!(%user_id, "change password with wrong old password");
        return Err(AppError::Validation("Old password is incorrect".into()));
    }

    let hash = st.passwords.hash(&new_password)?;
    st.users.update_password_hash(user_id, &hash).await?;

    // Tokens already issued stay valid until they expire.
    info!(%user_id, "password changed");
    Ok(())
}
