use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::users::repo::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    DuplicateEmail,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("No file uploaded")]
    NoFileProvided,

    #[error("Only image files (png, jpg, jpeg, webp) are allowed")]
    UnsupportedFileType,

    #[error("File exceeds the {max_bytes} byte limit")]
    FileTooLarge { max_bytes: usize },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            AppError::DuplicateEmail => (StatusCode::BAD_REQUEST, "DuplicateEmail"),
            AppError::EmailInUse => (StatusCode::BAD_REQUEST, "EmailInUse"),
            AppError::InvalidCredentials => (StatusCode::BAD_REQUEST, "InvalidCredentials"),
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Unauthenticated"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            AppError::NoFileProvided => (StatusCode::BAD_REQUEST, "NoFileProvided"),
            AppError::UnsupportedFileType => (StatusCode::BAD_REQUEST, "UnsupportedFileType"),
            AppError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FileTooLarge"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::NotFound => AppError::NotFound("User not found".into()),
            StoreError::Backend(inner) => AppError::Internal(inner),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}
