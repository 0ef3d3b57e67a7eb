use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    cookie,
    dto::{LoginRequest, SignupRequest, UserData},
    middleware::require_auth,
};
use crate::{
    config::AppEnv, error::AppError, response::ApiResponse, state::AppState, users::CurrentUser,
};

const MISSING_CREDENTIALS: &str = "Please provide username and password";
const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

/// The gate wraps each method handler only, so a wrong method falls through
/// to the router's 404 instead of being asked for a session.
pub fn session_routes(state: AppState) -> Router<AppState> {
    let gate = middleware::from_fn_with_state(state, require_auth);
    Router::new()
        .route("/logout", get(logout).route_layer(gate.clone()))
        .route("/getMe", get(get_me).route_layer(gate))
}

/// Issues a token for `user` and answers with it as the session cookie.
fn start_session(state: &AppState, status: StatusCode, user: CurrentUser) -> Result<Response, AppError> {
    let issued = state.tokens.issue(user.id)?;
    let cookie = cookie::session_cookie(
        &issued.token,
        issued.expires_at,
        state.tokens.lifetime(),
        state.config.env == AppEnv::Production,
    )?;
    Ok((
        status,
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::success(UserData { user })),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .create(
            payload.name.as_deref(),
            payload.username.as_deref(),
            payload.email.as_deref(),
            payload.password.as_deref(),
        )
        .await?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    start_session(&state, StatusCode::CREATED, user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let username = payload.username.filter(|v| !v.is_empty());
    let password = payload.password.filter(|v| !v.is_empty());
    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::BadRequest(MISSING_CREDENTIALS.into()));
    };

    let Some(user) = state.users.find_by_username(&username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::Unauthorized(INCORRECT_CREDENTIALS.into()));
    };

    if !state.users.verify_password(&password, &user.password_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INCORRECT_CREDENTIALS.into()));
    }

    info!(user_id = %user.id, "user logged in");
    start_session(&state, StatusCode::OK, CurrentUser::from(&user))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let cookie = cookie::cleared_cookie(state.config.env == AppEnv::Production)?;
    info!("user logged out");
    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(ApiResponse::empty())).into_response())
}

pub async fn get_me(user: CurrentUser) -> Json<ApiResponse<UserData>> {
    Json(ApiResponse::success(UserData { user }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::middleware::NOT_LOGGED_IN;
    use crate::test_support::{body_json, cookie_pair, get, post_json};
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        crate::app::build_app(AppState::fake()).expect("router")
    }

    fn ada() -> serde_json::Value {
        json!({
            "name": "Ada Lovelace",
            "username": "Ada_Lovelace",
            "email": "ada@example.com",
            "password": "Secur3P@ss"
        })
    }

    #[tokio::test]
    async fn signup_sets_cookie_and_hides_hash() {
        let app = app();
        let res = app.oneshot(post_json("/signup", &ada(), None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let set_cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_owned();
        assert!(set_cookie.starts_with("jwt="));
        assert!(set_cookie.contains("HttpOnly"));

        let body = body_json(res).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["user"]["username"], "ada_lovelace");
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn signup_validation_errors_are_aggregated() {
        let app = app();
        let res = app
            .oneshot(post_json(
                "/signup",
                &json!({ "name": "Bob", "username": "bobby", "email": "bob@example.com", "password": "abc12345" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["status"], "fail");
        let msg = body["message"].as_str().unwrap();
        assert!(msg.contains("uppercase"));
        assert!(msg.contains("special character"));
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = app();
        let res = app.clone().oneshot(post_json("/signup", &ada(), None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let mut again = ada();
        again["username"] = json!("ADA_LOVELACE");
        again["email"] = json!("someone@example.com");
        let res = app.oneshot(post_json("/signup", &again, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let app = app();
        let res = app
            .oneshot(post_json("/login", &json!({ "username": "ada_lovelace" }), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["message"], MISSING_CREDENTIALS);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let app = app();
        app.clone().oneshot(post_json("/signup", &ada(), None)).await.unwrap();

        let wrong_password = app
            .clone()
            .oneshot(post_json(
                "/login",
                &json!({ "username": "ada_lovelace", "password": "Wr0ng!pass" }),
                None,
            ))
            .await
            .unwrap();
        let unknown_user = app
            .oneshot(post_json(
                "/login",
                &json!({ "username": "charles_b", "password": "Wr0ng!pass" }),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
    }

    #[tokio::test]
    async fn login_with_mixed_case_username() {
        let app = app();
        app.clone().oneshot(post_json("/signup", &ada(), None)).await.unwrap();
        let res = app
            .oneshot(post_json(
                "/login",
                &json!({ "username": "ADA_lovelace", "password": "Secur3P@ss" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(SET_COOKIE).is_some());
        assert_eq!(body_json(res).await["data"]["user"]["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn get_me_requires_session() {
        let res = app().oneshot(get("/getMe", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["message"], NOT_LOGGED_IN);
    }

    #[tokio::test]
    async fn logout_then_get_me_with_cleared_cookie_fails() {
        let app = app();
        let res = app.clone().oneshot(post_json("/signup", &ada(), None)).await.unwrap();
        let session = cookie_pair(&res);

        let me = app.clone().oneshot(get("/getMe", Some(&session))).await.unwrap();
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(body_json(me).await["data"]["user"]["name"], "Ada Lovelace");

        let out = app.clone().oneshot(get("/logout", Some(&session))).await.unwrap();
        assert_eq!(out.status(), StatusCode::OK);
        let cleared = cookie_pair(&out);
        assert_eq!(cleared, "jwt=");
        assert_eq!(body_json(out).await, json!({ "status": "success" }));

        let me_again = app.oneshot(get("/getMe", Some(&cleared))).await.unwrap();
        assert_eq!(me_again.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_method_is_json_404() {
        let app = app();
        for req in [get("/signup", None), get("/login", None), post_json("/getMe", &json!({}), None)] {
            let path = req.uri().path().to_owned();
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
            let body = body_json(res).await;
            assert_eq!(body["status"], "fail");
            assert_eq!(body["message"], format!("{path} endpoint does not exist!"));
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = app();
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["status"], "fail");
    }
}
