use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{state::AppState, users::repo::RepoError};

/// A unique field that already holds the submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateField {
    pub field: String,
    pub value: String,
}

/// Every failure a request can end with.
///
/// All variants except `Internal` are operational: their message is meant for
/// the client. `Internal` is logged and replaced by a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input data. {}", .0.join(". "))]
    Validation(Vec<String>),

    #[error("{}", conflict_message(.0))]
    Conflict(Vec<DuplicateField>),

    #[error("{0}")]
    BadRequest(String),

    /// Wrong credentials on login.
    #[error("{0}")]
    Unauthorized(String),

    /// Missing, invalid or expired session, or a session for a vanished user.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn conflict_message(fields: &[DuplicateField]) -> String {
    fields
        .iter()
        .map(|d| {
            format!(
                "Duplicate {field}: {value}. Please use another {field}.",
                field = d.field,
                value = d.value
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const GENERIC_MESSAGE: &str = "Something went very wrong!";

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) | Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client.
    pub fn message(&self) -> String {
        match self {
            Self::Internal(_) => GENERIC_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Duplicate(fields) => Self::Conflict(fields),
            RepoError::Backend(e) => Self::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Attached to every error response so the development layer can expand it.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: &'static str,
    pub message: String,
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Internal(e) = &self {
            error!(error = ?e, "unexpected failure");
        }

        let report = ErrorReport {
            status: self.status_label(),
            message: self.message(),
            detail: format!("{self:?}"),
        };
        let body = Json(json!({
            "status": report.status,
            "message": report.message,
        }));

        let mut res = (status, body).into_response();
        res.extensions_mut().insert(report);
        res
    }
}

/// In development mode, rewrites error bodies to include the full diagnostic.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let res = next.run(req).await;
    if !state.config.env.is_development() {
        return res;
    }

    match res.extensions().get::<ErrorReport>().cloned() {
        Some(report) => {
            let body = Json(json!({
                "status": report.status,
                "message": report.message,
                "error": report.detail,
            }));
            (res.status(), body).into_response()
        }
        None => res,
    }
}
