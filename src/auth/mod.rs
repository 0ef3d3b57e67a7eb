use crate::state::AppState;
use axum::Router;

mod claims;
pub mod cookie;
mod dto;
mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;

pub use middleware::require_auth;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::session_routes(state))
}
