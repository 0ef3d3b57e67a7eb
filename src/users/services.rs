use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    password::Hasher,
    repo::UserRepo,
    repo_types::{CurrentUser, NewUser, Socials, SocialsPatch, User},
    validation,
};
use crate::error::AppError;

/// Account operations on top of a [`UserRepo`].
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepo>,
    hasher: Hasher,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn UserRepo>, hasher: Hasher) -> Self {
        Self { repo, hasher }
    }

    /// Validates, hashes and inserts a new account. The password is hashed
    /// exactly once, before the record reaches the store.
    #[instrument(skip_all)]
    pub async fn create(
        &self,
        name: Option<&str>,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<CurrentUser, AppError> {
        let fields = validation::check_signup(name, username, email, password)
            .map_err(AppError::Validation)?;

        let hasher = self.hasher.clone();
        let plain = fields.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("password hashing task failed")??;

        let user = self
            .repo
            .insert(NewUser {
                id: Uuid::new_v4(),
                name: fields.name,
                username: fields.username,
                email: fields.email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(CurrentUser::from(&user))
    }

    /// Full record, hash included, for credential checks.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let username = validation::normalize_username(username);
        Ok(self.repo.find_by_username(&username).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CurrentUser>, AppError> {
        let user = self.repo.find_by_id(id).await?;
        Ok(user.as_ref().map(CurrentUser::from))
    }

    #[instrument(skip(self))]
    pub async fn get_socials(&self, username: &str) -> Result<Socials, AppError> {
        match self.find_by_username(username).await? {
            Some(user) => Ok(user.socials),
            None => {
                debug!("socials lookup for unknown user");
                Err(AppError::NotFound(format!(
                    "User with username: \"{username}\" does not exist"
                )))
            }
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update_socials(
        &self,
        user_id: Uuid,
        patch: SocialsPatch,
    ) -> Result<Socials, AppError> {
        let patch = validation::check_socials(patch).map_err(AppError::Validation)?;
        match self.repo.update_socials(user_id, &patch).await? {
            Some(user) => {
                info!(%user_id, "socials updated");
                Ok(user.socials)
            }
            None => Err(AppError::Unauthenticated(
                "The user belonging to this token does no longer exist".into(),
            )),
        }
    }

    /// Constant-time argon2 check, run off the async workers.
    pub async fn verify_password(&self, candidate: &str, stored_hash: &str) -> Result<bool, AppError> {
        let candidate = candidate.to_owned();
        let stored_hash = stored_hash.to_owned();
        let ok = tokio::task::spawn_blocking(move || Hasher::verify(&candidate, &stored_hash))
            .await
            .context("password verification task failed")??;
        Ok(ok)
    }
}
