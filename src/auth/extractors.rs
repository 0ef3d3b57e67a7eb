use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::middleware::NOT_LOGGED_IN;
use crate::{error::AppError, users::CurrentUser};

/// Hands the identity attached by `require_auth` to a handler.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            warn!("CurrentUser missing from request extensions");
            AppError::Unauthenticated(NOT_LOGGED_IN.into())
        })
    }
}
