use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    repo::{RepoError, UserRepo},
    repo_types::{NewUser, SocialsPatch, User},
};
use crate::error::DuplicateField;

/// Process-local user store, used when no database is configured and in tests.
/// Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserRepo {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, User>> {
        // A panic while holding the lock cannot leave a half-written record.
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.lock();

        let mut duplicates = Vec::new();
        if users.values().any(|u| u.username == user.username) {
            duplicates.push(DuplicateField {
                field: "username".into(),
                value: user.username.clone(),
            });
        }
        if users.values().any(|u| u.email == user.email) {
            duplicates.push(DuplicateField {
                field: "email".into(),
                value: user.email.clone(),
            });
        }
        if !duplicates.is_empty() {
            warn!(count = duplicates.len(), "duplicate user fields in memory");
            return Err(RepoError::Duplicate(duplicates));
        }

        let record = User {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            socials: Default::default(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        debug!(user_id = %record.id, "user inserted in memory");
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .lock()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn update_socials(
        &self,
        id: Uuid,
        patch: &SocialsPatch,
    ) -> Result<Option<User>, RepoError> {
        let mut users = self.lock();
        Ok(users.get_mut(&id).map(|user| {
            patch.apply(&mut user.socials);
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            name: "Test".into(),
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn insert_reports_every_duplicate_field() {
        let repo = InMemoryUserRepo::new();
        repo.insert(new_user("first_user", "first@example.com"))
            .await
            .unwrap();

        let err = repo
            .insert(new_user("first_user", "first@example.com"))
            .await
            .unwrap_err();
        match err {
            RepoError::Duplicate(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, ["username", "email"]);
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn update_socials_on_missing_user_is_none() {
        let repo = InMemoryUserRepo::new();
        let out = repo
            .update_socials(Uuid::new_v4(), &SocialsPatch::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
