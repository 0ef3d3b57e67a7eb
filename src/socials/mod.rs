use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes(state))
}
