use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use super::repo_types::{ProfilePatch, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for accounts and their credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, name: &str, email: &str, password_hash: &str)
        -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn update_fields(&self, id: Uuid, patch: &ProfilePatch) -> Result<User, StoreError>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, bio, avatar, skills, social, \
                            achievements, projects, level, xp, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => {
            error!(error = %e, "user store query failed");
            StoreError::Backend(e.into())
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)
    }

    async fn update_fields(&self, id: Uuid, patch: &ProfilePatch) -> Result<User, StoreError> {
        // One statement keeps the document write atomic; NULL binds keep the column.
        let sql = format!(
            r#"
            UPDATE users SET
                name         = COALESCE($2, name),
                email        = COALESCE($3, email),
                bio          = COALESCE($4, bio),
                avatar       = COALESCE($5, avatar),
                skills       = COALESCE($6, skills),
                social       = COALESCE($7, social),
                achievements = COALESCE($8, achievements),
                projects     = COALESCE($9, projects),
                level        = COALESCE($10, level),
                xp           = COALESCE($11, xp),
                updated_at   = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.email.as_deref())
            .bind(patch.bio.as_deref())
            .bind(patch.avatar.as_deref())
            .bind(patch.skills.as_ref())
            .bind(patch.social.as_ref().map(Json))
            .bind(patch.achievements.as_ref())
            .bind(patch.projects.as_ref().map(Json))
            .bind(patch.level)
            .bind(patch.xp)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .map_err(map_sqlx)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
