// TestDependencies - in-memory implementations for testing
//
// Provides doubles for the bus, the key-value store, the remote store and the
// page fetcher, plus a builder that wires them into ServerDeps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Result;
use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::broadcast;

use super::{
    BaseKeyValueStore, BaseMessageBus, BasePageFetcher, BaseRemoteStore, ProgressSink,
    RelaySettings, ServerDeps,
};
use crate::common::{ScrapeProgress, Session};

// =============================================================================
// Test Message Bus
// =============================================================================

/// A published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub channel: String,
    pub payload: String,
}

/// In-memory bus with the same at-most-once semantics as core NATS.
///
/// Records every publish so tests can inspect what would have gone out.
pub struct TestMessageBus {
    published: RwLock<Vec<PublishedMessage>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl Default for TestMessageBus {
    fn default() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl TestMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all published messages.
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Payloads published to a channel, in order.
    pub fn payloads_for(&self, channel: &str) -> Vec<String> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// How many times `payload` was published on `channel`.
    pub fn count_of(&self, channel: &str, payload: &str) -> usize {
        self.payloads_for(channel)
            .iter()
            .filter(|p| p.as_str() == payload)
            .count()
    }

    /// Live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Wait until someone subscribed to `channel` (messages published
    /// before that are lost, as on a real bus).
    pub async fn wait_for_subscriber(&self, channel: &str) {
        while self.subscriber_count(channel) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Wait until `payload` has been published `times` times on `channel`.
    pub async fn wait_for_publish(&self, channel: &str, payload: &str, times: usize) {
        while self.count_of(channel, payload) < times {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl BaseMessageBus for TestMessageBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                channel: channel.to_string(),
                payload: message.to_string(),
            });

        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = channels.get(channel) {
            // No receivers means nobody is listening: the message is dropped
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>> {
        let mut rx = self
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .subscribe();

        Ok(stream! {
            loop {
                match rx.recv().await {
                    Ok(message) => yield message,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .boxed())
    }
}

// =============================================================================
// Memory Key-Value Store
// =============================================================================

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseKeyValueStore for MemoryKeyValueStore {
    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}

// =============================================================================
// Mock Remote Store
// =============================================================================

/// A call made against the mock remote store, in the order it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Download { filename: String, dest: PathBuf },
    Delete { filename: String },
}

/// Remote store holding files in memory. Downloads write real files.
#[derive(Default)]
pub struct MockRemoteStore {
    files: Mutex<Vec<(String, Vec<u8>)>>,
    calls: Mutex<Vec<StoreCall>>,
    listing_status: Mutex<Option<u16>>,
    failing_downloads: Mutex<Vec<String>>,
    failing_deletes: Mutex<Vec<String>>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, content: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .push((name.to_string(), content.to_vec()));
        self
    }

    /// Make `list` fail as if the server answered with `status`.
    pub fn with_listing_status(self, status: u16) -> Self {
        *self.listing_status.lock().unwrap() = Some(status);
        self
    }

    pub fn failing_download(self, name: &str) -> Self {
        self.failing_downloads.lock().unwrap().push(name.to_string());
        self
    }

    pub fn failing_delete(self, name: &str) -> Self {
        self.failing_deletes.lock().unwrap().push(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Files still present remotely.
    pub fn remaining(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BaseRemoteStore for MockRemoteStore {
    async fn list(&self) -> Result<Vec<String>> {
        self.record(StoreCall::List);
        if let Some(status) = *self.listing_status.lock().unwrap() {
            anyhow::bail!("listing failed with status {}", status);
        }
        Ok(self.remaining())
    }

    async fn download(&self, filename: &str, dest: &Path) -> Result<u64> {
        if self.failing_downloads.lock().unwrap().iter().any(|f| f == filename) {
            anyhow::bail!("GET {} returned status 500", filename);
        }
        let content = self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| anyhow::anyhow!("GET {} returned status 404", filename))?;

        tokio::fs::write(dest, &content).await?;
        self.record(StoreCall::Download {
            filename: filename.to_string(),
            dest: dest.to_path_buf(),
        });
        Ok(content.len() as u64)
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        if self.failing_deletes.lock().unwrap().iter().any(|f| f == filename) {
            anyhow::bail!("DELETE {} returned status 423", filename);
        }
        self.files.lock().unwrap().retain(|(name, _)| name != filename);
        self.record(StoreCall::Delete {
            filename: filename.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Mock Page Fetcher
// =============================================================================

/// Serves canned HTML by URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct MockPageFetcher {
    pages: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
        self
    }

    /// URLs fetched, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BasePageFetcher for MockPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("HTTP 404 Not Found for {}", url))
    }
}

// =============================================================================
// Recording Progress Sink
// =============================================================================

/// Progress client that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    received: Mutex<Vec<ScrapeProgress>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose connection is already gone.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<ScrapeProgress> {
        self.received.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Wait until a terminal event arrived and return everything received.
    pub async fn wait_for_terminal(&self) -> Vec<ScrapeProgress> {
        loop {
            let events = self.events();
            if events.iter().any(ScrapeProgress::is_terminal) {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn send(&self, progress: &ScrapeProgress) -> Result<()> {
        if self.fail {
            anyhow::bail!("connection reset");
        }
        self.received.lock().unwrap().push(progress.clone());
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Builder for ServerDeps backed by the doubles above.
pub struct TestDependencies {
    pub bus: Arc<TestMessageBus>,
    pub kv: Arc<MemoryKeyValueStore>,
    pub remote_store: Arc<MockRemoteStore>,
    pub page_fetcher: Arc<MockPageFetcher>,
    pub session: Session,
    pub settings: RelaySettings,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        let mut settings = RelaySettings {
            channel: "relay-test".to_string(),
            ..Default::default()
        };
        settings.extractor.pacing = Duration::ZERO;

        Self {
            bus: Arc::new(TestMessageBus::new()),
            kv: Arc::new(MemoryKeyValueStore::new()),
            remote_store: Arc::new(MockRemoteStore::new()),
            page_fetcher: Arc::new(MockPageFetcher::new()),
            session: Session::new(std::env::temp_dir()),
            settings,
        }
    }

    pub fn mock_remote_store(mut self, store: MockRemoteStore) -> Self {
        self.remote_store = Arc::new(store);
        self
    }

    pub fn mock_page_fetcher(mut self, fetcher: MockPageFetcher) -> Self {
        self.page_fetcher = Arc::new(fetcher);
        self
    }

    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session = Session::new(path);
        self
    }

    pub fn ws_idle_timeout(mut self, timeout: Duration) -> Self {
        self.settings.ws_idle_timeout = timeout;
        self
    }

    /// Wire everything into ServerDeps.
    pub fn into_server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.bus.clone(),
            self.kv.clone(),
            self.remote_store.clone(),
            self.page_fetcher.clone(),
            self.session.clone(),
            self.settings.clone(),
        )
        .expect("default extractor config is valid")
    }
}
