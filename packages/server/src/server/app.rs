//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    continue_handler, health_handler, scrape_handler, start_handler,
};
use crate::server::ws::ws_handler;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub server_deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(server_deps: ServerDeps) -> Router {
    let app_state = AppState {
        server_deps: Arc::new(server_deps),
    };

    // The front-end is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/scrape", post(scrape_handler))
        .route("/start", post(start_handler))
        .route("/continue", get(continue_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
