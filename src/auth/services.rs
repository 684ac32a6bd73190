use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::password::{check_password_policy, MIN_PASSWORD_LEN};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{StoreError, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

// Passwords are taken byte for byte; whitespace counts.
fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

pub async fn register_user(
    st: &AppState,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> AppResult<(User, String)> {
    let (Some(name), Some(email), Some(password)) =
        (non_blank(name), non_blank(email), non_empty(password))
    else {
        return Err(AppError::Validation("All fields are required".into()));
    };
    let name = name.trim().to_string();
    let email = email.trim().to_string();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if !check_password_policy(&password) {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let hash = st.passwords.hash(&password)?;
    // The unique constraint still wins if a concurrent request got there first.
    let user = st.users.create(&name, &email, &hash).await.map_err(|e| {
        if matches!(e, StoreError::DuplicateEmail) {
            warn!(email = %email, "email registered concurrently");
        }
        AppError::from(e)
    })?;

    let token = st.jwt.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

pub async fn login_user(
    st: &AppState,
    email: Option<String>,
    password: Option<String>,
) -> AppResult<(User, String)> {
    let (Some(email), Some(password)) = (non_blank(email), non_empty(password)) else {
        return Err(AppError::Validation("Email and password are required".into()));
    };
    let email = email.trim();

    let Some(user) = st.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !st.passwords.verify(&password, &user.password_hash) {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = st.jwt.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}
