use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::SocialsData;
use crate::{
    auth::require_auth,
    error::AppError,
    response::ApiResponse,
    state::AppState,
    users::{CurrentUser, SocialsPatch},
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/socials/:username", get(get_socials))
}

pub fn write_routes(state: AppState) -> Router<AppState> {
    Router::new().route(
        "/socials",
        post(update_socials).route_layer(middleware::from_fn_with_state(state, require_auth)),
    )
}

#[instrument(skip(state))]
pub async fn get_socials(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<SocialsData>>, AppError> {
    let socials = state.users.get_socials(&username).await?;
    Ok(Json(ApiResponse::success(SocialsData { socials })))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_socials(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<SocialsPatch>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SocialsData>>), AppError> {
    let Json(patch) = payload?;
    let socials = state.users.update_socials(user.id, patch).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SocialsData { socials })),
    ))
}
