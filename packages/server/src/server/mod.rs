// HTTP server setup (Axum + WebSocket progress)
pub mod app;
pub mod routes;
pub mod ws;

pub use app::*;
