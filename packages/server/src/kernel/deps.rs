//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container shared by the HTTP
//! gateway and the download orchestrator. All external services sit behind
//! trait abstractions so tests can run without NATS or a WebDAV server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use webdav_client::WebDavClient;

use crate::common::Session;
use crate::domains::scraping::{ExtractorConfig, LinkExtractor};
use crate::kernel::{
    BaseKeyValueStore, BaseMessageBus, BasePageFetcher, BaseRemoteStore, ProgressHub,
};

// =============================================================================
// WebDavClient Adapter (implements BaseRemoteStore trait)
// =============================================================================

/// Wrapper around WebDavClient that implements BaseRemoteStore trait
pub struct WebDavAdapter(pub Arc<WebDavClient>);

impl WebDavAdapter {
    pub fn new(client: Arc<WebDavClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseRemoteStore for WebDavAdapter {
    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.0.list().await?)
    }

    async fn download(&self, filename: &str, dest: &Path) -> Result<u64> {
        Ok(self.0.download(filename, dest).await?)
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        Ok(self.0.delete(filename).await?)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Tunables shared by the gateway and the orchestrator.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Control channel name on the bus
    pub channel: String,
    pub extractor: ExtractorConfig,
    /// How long a WebSocket waits for inbound data before checking again
    pub ws_idle_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            channel: "relay".to_string(),
            extractor: ExtractorConfig::default(),
            ws_idle_timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to routes and the orchestrator
#[derive(Clone)]
pub struct ServerDeps {
    pub bus: Arc<dyn BaseMessageBus>,
    /// Shared keyed state (selected-links record)
    pub kv: Arc<dyn BaseKeyValueStore>,
    pub remote_store: Arc<dyn BaseRemoteStore>,
    pub extractor: Arc<LinkExtractor>,
    /// Live WebSocket clients receiving scrape progress
    pub progress_hub: ProgressHub,
    pub session: Session,
    pub settings: RelaySettings,
}

impl ServerDeps {
    pub fn new(
        bus: Arc<dyn BaseMessageBus>,
        kv: Arc<dyn BaseKeyValueStore>,
        remote_store: Arc<dyn BaseRemoteStore>,
        page_fetcher: Arc<dyn BasePageFetcher>,
        session: Session,
        settings: RelaySettings,
    ) -> Result<Self> {
        let extractor = LinkExtractor::new(page_fetcher, settings.extractor.clone())?;

        Ok(Self {
            bus,
            kv,
            remote_store,
            extractor: Arc::new(extractor),
            progress_hub: ProgressHub::new(),
            session,
            settings,
        })
    }
}
