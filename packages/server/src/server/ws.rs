//! GET /ws - live scrape progress.
//!
//! Each connection registers a sink with the progress hub and then just
//! keeps the socket alive: inbound frames are read and discarded, an idle
//! timeout only re-arms the wait. Close or a socket error deregisters.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::common::ScrapeProgress;
use crate::kernel::ProgressSink;
use crate::server::app::AppState;

/// Outbound half of a WebSocket, as a progress sink.
pub struct WebSocketSink {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

impl WebSocketSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

#[async_trait]
impl ProgressSink for WebSocketSink {
    async fn send(&self, progress: &ScrapeProgress) -> Result<()> {
        let text = serde_json::to_string(progress)?;
        self.sender
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .context("WebSocket send failed")?;
        Ok(())
    }
}

pub async fn ws_handler(
    Extension(state): Extension<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let deps = &state.server_deps;
    let idle_timeout = deps.settings.ws_idle_timeout;

    let (sender, mut receiver) = socket.split();
    let id = deps
        .progress_hub
        .register(Arc::new(WebSocketSink::new(sender)))
        .await;
    info!(client = id, "WebSocket client connected");

    loop {
        match tokio::time::timeout(idle_timeout, receiver.next()).await {
            // Idle: keep waiting
            Err(_) => continue,
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => {
                debug!(client = id, error = %e, "WebSocket receive failed");
                break;
            }
        }
    }

    deps.progress_hub.deregister(id).await;
    info!(client = id, "WebSocket client disconnected");
}
