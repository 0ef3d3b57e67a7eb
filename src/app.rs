use std::net::SocketAddr;

use axum::{
    extract::OriginalUri,
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use anyhow::Context;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{expose_error_detail, AppError};
use crate::state::AppState;
use crate::{auth, socials};

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let origin: HeaderValue = state
        .config
        .cors_origin
        .parse()
        .with_context(|| format!("invalid CORS_ORIGIN {:?}", state.config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .merge(auth::router(state.clone()))
        .merge(socials::router(state.clone()))
        .route("/health", get(health))
        .method_not_allowed_fallback(endpoint_not_found)
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), expose_error_detail))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        ))
}

async fn health() -> &'static str {
    "ok"
}

async fn endpoint_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("{} endpoint does not exist!", uri.path()))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
