use anyhow::Context;

/// Which error rendering the service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown APP_ENV {other:?}"),
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Longest accepted session lifetime, about a century.
pub const MAX_EXPIRES_IN_DAYS: i64 = 36_500;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_days: i64,
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.secret.is_empty(), "JWT_SECRET must not be empty");
        anyhow::ensure!(
            (1..=MAX_EXPIRES_IN_DAYS).contains(&self.expires_in_days),
            "JWT_EXPIRES_IN must be between 1 and {MAX_EXPIRES_IN_DAYS} days, got {}",
            self.expires_in_days
        );
        Ok(())
    }
}

/// Argon2 cost parameters used when hashing new passwords.
#[derive(Debug, Clone, Copy)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub env: AppEnv,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            expires_in_days: parse_var("JWT_EXPIRES_IN")?.unwrap_or(90),
        };
        jwt.validate()?;

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parse_var("ARGON2_MEMORY_KIB")?.unwrap_or(defaults.memory_kib),
            iterations: parse_var("ARGON2_ITERATIONS")?.unwrap_or(defaults.iterations),
        };

        let env = match std::env::var("APP_ENV") {
            Ok(raw) => AppEnv::parse(&raw)?,
            Err(_) => AppEnv::Production,
        };

        Ok(Self {
            database_url,
            jwt,
            hash,
            env,
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{name} is not a valid number")),
        Err(_) => Ok(None),
    }
}
