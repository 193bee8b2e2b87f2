use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use openbpl_types::api::Envelope;
use std::time::Duration;
use thiserror::Error;

/// Request-level failure. `IntoResponse` here is the only place that picks
/// an HTTP status and error body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (code, Json(Envelope::<()>::error(msg))).into_response()
    }
}

/// Server lifecycle failure.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server forced to shut down after {0:?}")]
    ShutdownTimeout(Duration),
}
