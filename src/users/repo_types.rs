use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never leaves the store layer
    pub bio: String,
    pub avatar: String,
    pub skills: Vec<String>,
    pub social: Json<Social>,
    pub achievements: Vec<String>,
    pub projects: Json<Vec<Project>>,
    pub level: i32,
    pub xp: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Social {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Field-level partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub skills: Option<Vec<String>>,
    pub social: Option<Social>,
    pub achievements: Option<Vec<String>>,
    pub projects: Option<Vec<Project>>,
    pub level: Option<i32>,
    pub xp: Option<i64>,
}

impl ProfilePatch {
    pub fn avatar(avatar: impl Into<String>) -> Self {
        Self {
            avatar: Some(avatar.into()),
            ..Self::default()
        }
    }
}

/// Profile as returned to clients. Has no password field at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub avatar: String,
    pub skills: Vec<String>,
    pub social: Social,
    pub achievements: Vec<String>,
    pub projects: Vec<Project>,
    pub level: i32,
    pub xp: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            bio: u.bio,
            avatar: u.avatar,
            skills: u.skills,
            social: u.social.0,
            achievements: u.achievements,
            projects: u.projects.0,
            level: u.level,
            xp: u.xp,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
