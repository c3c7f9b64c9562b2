use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    bus: String,
    /// Live WebSocket clients
    clients: usize,
}

/// Health check endpoint
///
/// The bus is reported "ok" whenever the process is up: startup fails
/// without a bus connection.
pub async fn health_handler(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    let clients = state.server_deps.progress_hub.client_count().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        bus: "ok".to_string(),
        clients,
    })
}
