use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::{cookie, jwt::TokenError};
use crate::{error::AppError, state::AppState, users::CurrentUser};

pub const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access";
pub const INVALID_TOKEN: &str = "Invalid token. Please log in again";
pub const EXPIRED_TOKEN: &str = "Your token has expired. Please log in again";
pub const USER_GONE: &str = "The user belonging to this token does no longer exist";

/// Resolves the session cookie in `headers` to the account it belongs to.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let token = cookie::session_token(headers).ok_or_else(|| {
        debug!("no session cookie");
        AppError::Unauthenticated(NOT_LOGGED_IN.into())
    })?;

    let user_id = state.tokens.verify(token).map_err(|e| {
        warn!(error = %e, "session token rejected");
        match e {
            TokenError::Invalid => AppError::Unauthenticated(INVALID_TOKEN.into()),
            TokenError::Expired => AppError::Unauthenticated(EXPIRED_TOKEN.into()),
        }
    })?;

    state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "session for missing user");
        AppError::Unauthenticated(USER_GONE.into())
    })
}

/// Gate for routes that need a logged-in user. On success the request gets a
/// [`CurrentUser`] extension.
/// Usage: `.route_layer(middleware::from_fn_with_state(state, require_auth))`
#[instrument(skip_all, fields(uri = %req.uri()))]
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    debug!(user_id = %user.id, "request authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
