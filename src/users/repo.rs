use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::repo_types::{NewUser, SocialsPatch, User, UserRow};
use crate::error::DuplicateField;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    Duplicate(Vec<DuplicateField>),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for user records. Uniqueness of username and email is the
/// store's job, not the caller's.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    /// Returns `None` when no user has this id.
    async fn update_socials(
        &self,
        id: Uuid,
        patch: &SocialsPatch,
    ) -> Result<Option<User>, RepoError>;
}

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, twitter, facebook, github, twitch, created_at";

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Field guarded by a unique constraint of the `users` table.
fn duplicate_field(constraint: &str, user: &NewUser) -> Option<DuplicateField> {
    let (field, value) = match constraint {
        "users_username_key" => ("username", &user.username),
        "users_email_key" => ("email", &user.email),
        _ => return None,
    };
    Some(DuplicateField {
        field: field.into(),
        value: value.clone(),
    })
}

/// Maps a unique violation to the field it guards. Postgres reports only the
/// first violated constraint, so at most one field comes back from here.
fn map_insert_error(e: sqlx::Error, user: &NewUser) -> RepoError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            if let Some(d) = db_err.constraint().and_then(|c| duplicate_field(c, user)) {
                warn!(field = %d.field, "duplicate user field");
                return RepoError::Duplicate(vec![d]);
            }
        }
    }
    RepoError::Backend(anyhow::Error::new(e).context("insert user"))
}

#[async_trait]
impl UserRepo for PgUserRepo {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, username, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_insert_error(e, &user))?;
        debug!(user_id = %row.id, "user inserted");
        Ok(row.into())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self, patch))]
    async fn update_socials(
        &self,
        id: Uuid,
        patch: &SocialsPatch,
    ) -> Result<Option<User>, RepoError> {
        // Each provider gets a (touched, value) pair so untouched columns keep
        // their current value inside the same statement.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                twitter  = CASE WHEN $2 THEN $3 ELSE twitter END,
                facebook = CASE WHEN $4 THEN $5 ELSE facebook END,
                github   = CASE WHEN $6 THEN $7 ELSE github END,
                twitch   = CASE WHEN $8 THEN $9 ELSE twitch END
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.twitter.is_some())
        .bind(patch.twitter.clone().flatten())
        .bind(patch.facebook.is_some())
        .bind(patch.facebook.clone().flatten())
        .bind(patch.github.is_some())
        .bind(patch.github.clone().flatten())
        .bind(patch.twitch.is_some())
        .bind(patch.twitch.clone().flatten())
        .fetch_optional(&self.db)
        .await
        .context("update socials")?;
        Ok(row.map(User::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            name: "Grace Hopper".into(),
            username: username.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
        }
    }

    #[test]
    fn constraint_names_map_to_fields() {
        let user = new_user("grace_h", "grace@navy.mil");

        let d = duplicate_field("users_username_key", &user).unwrap();
        assert_eq!((d.field.as_str(), d.value.as_str()), ("username", "grace_h"));

        let d = duplicate_field("users_email_key", &user).unwrap();
        assert_eq!((d.field.as_str(), d.value.as_str()), ("email", "grace@navy.mil"));

        assert!(duplicate_field("users_pkey", &user).is_none());
    }

    #[test]
    fn non_database_errors_are_backend_failures() {
        let err = map_insert_error(sqlx::Error::RowNotFound, &new_user("grace_h", "g@x.io"));
        assert!(matches!(err, RepoError::Backend(_)));
    }

    /// Needs a disposable database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn postgres_round_trip() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL");
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&db).await.unwrap();
        let repo = PgUserRepo::new(db);

        let tag = Uuid::new_v4().simple().to_string();
        let username = format!("u_{}", &tag[..12]);
        let email = format!("{tag}@example.com");
        let user = repo.insert(new_user(&username, &email)).await.unwrap();

        let err = repo
            .insert(new_user(&username, &format!("other{tag}@example.com")))
            .await
            .unwrap_err();
        match err {
            RepoError::Duplicate(fields) => assert_eq!(fields[0].field, "username"),
            other => panic!("expected duplicate, got {other:?}"),
        }

        let err = repo
            .insert(new_user(&format!("v_{}", &tag[..12]), &email))
            .await
            .unwrap_err();
        match err {
            RepoError::Duplicate(fields) => assert_eq!(fields[0].field, "email"),
            other => panic!("expected duplicate, got {other:?}"),
        }

        let set = SocialsPatch {
            github: Some(Some("ghopper".into())),
            twitter: Some(Some("grace.h".into())),
            ..Default::default()
        };
        repo.update_socials(user.id, &set).await.unwrap().unwrap();

        let unset = SocialsPatch {
            twitter: Some(None),
            ..Default::default()
        };
        let updated = repo.update_socials(user.id, &unset).await.unwrap().unwrap();
        assert_eq!(updated.socials.github.as_deref(), Some("ghopper"));
        assert_eq!(updated.socials.twitter, None);
        assert_eq!(updated.password_hash, "$argon2id$stub");

        let found = repo.find_by_username(&username).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo
            .update_socials(Uuid::new_v4(), &unset)
            .await
            .unwrap()
            .is_none());
    }
}
