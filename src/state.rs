use crate::auth::jwt::TokenService;
use crate::config::AppConfig;
use crate::users::{
    memory::InMemoryUserRepo,
    password::Hasher,
    repo::{PgUserRepo, UserRepo},
    CredentialStore,
};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: CredentialStore,
    pub tokens: TokenService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let repo: Arc<dyn UserRepo> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connecting to postgres")?;

                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("running migrations")?;

                Arc::new(PgUserRepo::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; accounts are kept in memory");
                Arc::new(InMemoryUserRepo::new())
            }
        };

        Self::from_parts(config, repo)
    }

    pub fn from_parts(config: AppConfig, repo: Arc<dyn UserRepo>) -> anyhow::Result<Self> {
        let hasher = Hasher::new(config.hash)?;
        let tokens = TokenService::new(&config.jwt)?;
        Ok(Self {
            users: CredentialStore::new(repo, hasher),
            tokens,
            config: Arc::new(config),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_env(crate::config::AppEnv::Production)
    }

    #[cfg(test)]
    pub fn fake_with_env(env: crate::config::AppEnv) -> Self {
        let config = AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                expires_in_days: 1,
            },
            hash: crate::config::HashConfig {
                memory_kib: 64,
                iterations: 1,
            },
            env,
            cors_origin: "http://localhost:3000".into(),
        };

        Self::from_parts(config, Arc::new(InMemoryUserRepo::new())).expect("fake state")
    }
}
