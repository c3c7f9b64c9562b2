//! POST /start and GET /continue

use axum::{extract::Extension, Json};

use super::{ApiError, StatusResponse};
use crate::common::ScrapedLink;
use crate::domains::downloads::{request_local_download, request_relay};
use crate::server::app::AppState;

/// Record the user's selection and signal the relay step.
pub async fn start_handler(
    Extension(state): Extension<AppState>,
    Json(links): Json<Vec<ScrapedLink>>,
) -> Result<Json<StatusResponse>, ApiError> {
    request_relay(&state.server_deps, &links).await?;
    Ok(Json(StatusResponse::ok("URLs added to the queue")))
}

/// Signal the orchestrator to drain the remote store.
pub async fn continue_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    request_local_download(&state.server_deps).await?;
    Ok(Json(StatusResponse::ok(
        "Continuing download from remote store",
    )))
}
