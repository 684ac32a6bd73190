use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UserStore};
use super::repo_types::{ProfilePatch, Social, User};

/// Process-local store. The uniqueness check and the write share one lock.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

fn apply(patch: &ProfilePatch, user: &mut User) {
    if let Some(v) = &patch.name {
        user.name = v.clone();
    }
    if let Some(v) = &patch.email {
        user.email = v.clone();
    }
    if let Some(v) = &patch.bio {
        user.bio = v.clone();
    }
    if let Some(v) = &patch.avatar {
        user.avatar = v.clone();
    }
    if let Some(v) = &patch.skills {
        user.skills = v.clone();
    }
    if let Some(v) = &patch.social {
        user.social = Json(v.clone());
    }
    if let Some(v) = &patch.achievements {
        user.achievements = v.clone();
    }
    if let Some(v) = &patch.projects {
        user.projects = Json(v.clone());
    }
    if let Some(v) = patch.level {
        user.level = v;
    }
    if let Some(v) = patch.xp {
        user.xp = v;
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if email_taken(&users, email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            bio: String::new(),
            avatar: String::new(),
            skills: Vec::new(),
            social: Json(Social::default()),
            achievements: Vec::new(),
            projects: Json(Vec::new()),
            level: 1,
            xp: 0,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_fields(&self, id: Uuid, patch: &ProfilePatch) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if let Some(email) = &patch.email {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        apply(patch, user);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryUserStore::new();
        store.create("A", "x@e.com", "h").await.unwrap();
        let err = store.create("B", "x@e.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_with_one_email_admit_exactly_one() {
        let store = std::sync::Arc::new(MemoryUserStore::new());
        let spawn = |name: &'static str| {
            let store = store.clone();
            tokio::spawn(async move { store.create(name, "race@e.com", "h").await })
        };
        let (a, b, c, d) = tokio::join!(spawn("A"), spawn("B"), spawn("C"), spawn("D"));
        let results = [a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::DuplicateEmail)));
        assert!(store.find_by_email("race@e.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let store = MemoryUserStore::new();
        store.create("A", "x@e.com", "h").await.unwrap();
        assert!(store.create("B", "X@e.com", "h").await.is_ok());
        assert!(store.find_by_email("X@E.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_accounts_get_profile_defaults() {
        let store = MemoryUserStore::new();
        let u = store.create("A", "a@b.com", "h").await.unwrap();
        assert_eq!(u.level, 1);
        assert_eq!(u.xp, 0);
        assert!(u.skills.is_empty());
        assert_eq!(u.social.0, Social::default());

        let found = store.find_by_id(u.id).await.unwrap().unwrap();
        assert_eq!(found.email, "a@b.com");
    }

    #[tokio::test]
    async fn partial_update_is_idempotent_and_leaves_other_fields() {
        let store = MemoryUserStore::new();
        let u = store.create("A", "a@b.com", "h").await.unwrap();
        store
            .update_fields(
                u.id,
                &ProfilePatch {
                    skills: Some(vec!["rust".into()]),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap();

        let patch = ProfilePatch {
            bio: Some("x".into()),
            ..ProfilePatch::default()
        };
        store.update_fields(u.id, &patch).await.unwrap();
        let after = store.update_fields(u.id, &patch).await.unwrap();

        assert_eq!(after.bio, "x");
        assert_eq!(after.name, "A");
        assert_eq!(after.skills, vec!["rust".to_string()]);
        assert_eq!(after.password_hash, "h");
    }

    #[tokio::test]
    async fn email_change_rechecks_other_accounts() {
        let store = MemoryUserStore::new();
        let a = store.create("A", "a@b.com", "h").await.unwrap();
        store.create("B", "b@b.com", "h").await.unwrap();

        let err = store
            .update_fields(
                a.id,
                &ProfilePatch {
                    email: Some("b@b.com".into()),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        // Re-saving one's own address is fine.
        let same = ProfilePatch {
            email: Some("a@b.com".into()),
            ..ProfilePatch::default()
        };
        assert!(store.update_fields(a.id, &same).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = MemoryUserStore::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.update_fields(missing, &ProfilePatch::default()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.update_password_hash(missing, "h").await,
            Err(StoreError::NotFound)
        ));
        assert!(store.find_by_id(missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn password_hash_update_replaces_hash() {
        let store = MemoryUserStore::new();
        let u = store.create("A", "a@b.com", "old").await.unwrap();
        store.update_password_hash(u.id, "new").await.unwrap();
        let found = store.find_by_id(u.id).await.unwrap().unwrap();
        assert_eq!(found.password_hash, "new");
    }
}
