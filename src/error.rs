//! External failure shape and the single conversion point into it.
//!
//! Generalizes the teacher's `SyncError` (a flat `thiserror` enum wrapping
//! the one backing store it knew about) into the layered shape this
//! service needs: a fatal `AppError` at the HTTP boundary, and the
//! per-change `ValidationError` (see `domain::validate`) that never
//! reaches this type because the orchestrator swallows it per spec.md §7.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("envelope invalid: {0}")]
    EnvelopeInvalid(String),

    #[error("request body too large")]
    BodyTooLarge,

    #[error("unauthorized")]
    Unauthorized,

    #[error("store error")]
    Store(#[from] crate::store::StoreError),

    #[error("sync call timed out")]
    Timeout,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::EnvelopeInvalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large".to_string(),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::Store(err) => {
                tracing::error!(error = %err, "store error while handling sync request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            AppError::Timeout => {
                tracing::error!("sync call exceeded its deadline");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
