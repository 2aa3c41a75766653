//! Application error handling.
//!
//! Every handler returns [`AppError`]; its `IntoResponse` impl maps each
//! variant to a status code and a `{"error": "..."}` JSON body. Internal
//! failures are logged with their source and surfaced to the client as a
//! generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::db::RepositoryError;
use crate::images::ImageStoreError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::session::SessionError;

/// Application error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or semantically invalid input. 400.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, or wrong-tenant credentials. 401.
    #[error("{0}")]
    Unauthorized(String),

    /// The resource doesn't exist within the caller's organization. 404.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule was violated. 409.
    #[error("{0}")]
    Conflict(String),

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Authentication service failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Order engine failure.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Session token failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Image store failure.
    #[error(transparent)]
    Image(#[from] ImageStoreError),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),

            Self::Repository(err) => match err {
                RepositoryError::NotFound => {
                    (StatusCode::NOT_FOUND, "not found".to_owned())
                }
                RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    tracing::error!(error = %err, "repository error");
                    internal()
                }
            },

            Self::Auth(err) => err.status_and_message(),
            Self::Order(err) => err.status_and_message(),

            Self::Session(err) => match err {
                SessionError::Invalid => {
                    (StatusCode::UNAUTHORIZED, "invalid session".to_owned())
                }
                SessionError::Signing(_) => {
                    tracing::error!(error = %err, "session signing error");
                    internal()
                }
            },

            Self::Image(err) => match err {
                ImageStoreError::InvalidContentType(ct) => (
                    StatusCode::BAD_REQUEST,
                    format!("unsupported image type: {ct}"),
                ),
                ImageStoreError::Io(_) => {
                    tracing::error!(error = %err, "image store error");
                    internal()
                }
            },

            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_owned(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
