//! Registry of live-progress clients.
//!
//! Every connected WebSocket registers a [`ProgressSink`]. A broadcast goes
//! to every sink in turn; a sink whose send fails or stalls past the send
//! timeout is dropped from the registry and the broadcast carries on with the rest.
//!
//! # Usage
//!
//! Consumers (WebSocket endpoint):
//!   let id = hub.register(Arc::new(sink)).await;
//!   ...
//!   hub.deregister(id).await;
//!
//! Producers (scrape task):
//!   hub.broadcast(&progress).await;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::common::ScrapeProgress;

/// Identifier handed out on registration.
pub type ClientId = u64;

/// Destination for progress events (one per connected client).
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send(&self, progress: &ScrapeProgress) -> Result<()>;
}

/// How long one client may take to accept an event.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Thread-safe, cloneable client registry.
#[derive(Clone)]
pub struct ProgressHub {
    clients: Arc<RwLock<HashMap<ClientId, Arc<dyn ProgressSink>>>>,
    next_id: Arc<AtomicU64>,
    send_timeout: Duration,
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self {
            clients: Arc::default(),
            next_id: Arc::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client slower than `timeout` counts as disconnected.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub async fn register(&self, sink: Arc<dyn ProgressSink>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.write().await.insert(id, sink);
        id
    }

    /// Remove a client. No-op if it is already gone.
    pub async fn deregister(&self, id: ClientId) {
        self.clients.write().await.remove(&id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Send to every registered client. Returns how many received it.
    pub async fn broadcast(&self, progress: &ScrapeProgress) -> usize {
        // Snapshot so sends don't hold the lock (clients may (de)register meanwhile)
        let clients: Vec<(ClientId, Arc<dyn ProgressSink>)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, sink) in clients {
            match tokio::time::timeout(self.send_timeout, sink.send(progress)).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(client_id = id, error = %e, "Dropping progress client");
                    failed.push(id);
                }
                Err(_) => {
                    warn!(client_id = id, "Dropping stalled progress client");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut clients = self.clients.write().await;
            for id in failed {
                clients.remove(&id);
            }
        }

        delivered
    }
}
