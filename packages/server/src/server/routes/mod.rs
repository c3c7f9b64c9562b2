// HTTP routes
pub mod downloads;
pub mod health;
pub mod scrape;

pub use downloads::*;
pub use health::*;
pub use scrape::*;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// `{"status": .., "message": ..}` body used by the trigger routes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "OK",
            message: message.into(),
        }
    }
}

/// A synchronous failure (bus publish, key-value write) surfaced as a 500.
#[derive(Debug)]
pub struct ApiError(pub anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = %self.0, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse {
                status: "ERROR",
                message: format!("{:#}", self.0),
            }),
        )
            .into_response()
    }
}
