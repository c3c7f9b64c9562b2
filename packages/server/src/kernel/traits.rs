// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The orchestrator, the extractor and the gateway are written against these
// so tests can swap NATS, WebDAV and HTTP for in-memory doubles.
//
// Naming convention: Base* for trait names (e.g., BaseMessageBus)

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

// =============================================================================
// Message Bus Trait (fire-and-forget pub/sub)
// =============================================================================

/// Plain publish/subscribe channel.
///
/// Delivery is at-most-once per live subscriber, in publish order. A
/// subscriber that is not listening when a message is published never sees
/// it. No acknowledgements, no persistence.
#[async_trait]
pub trait BaseMessageBus: Send + Sync {
    /// Publish a message on a channel. Succeeds even with no subscribers.
    async fn publish(&self, channel: &str, message: &str) -> Result<()>;

    /// Subscribe to a channel. The stream only ends if the connection does.
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>>;
}

// =============================================================================
// Key-Value Trait (shared keyed state)
// =============================================================================

#[async_trait]
pub trait BaseKeyValueStore: Send + Sync {
    /// Overwrite the value under `key`. Returns once the write is acknowledged.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
}

// =============================================================================
// Remote Store Trait (WebDAV file store)
// =============================================================================

#[async_trait]
pub trait BaseRemoteStore: Send + Sync {
    /// File names in the remote collection, in listing order.
    async fn list(&self) -> Result<Vec<String>>;

    /// Download `filename` to `dest`, fully flushed before returning `Ok`.
    async fn download(&self, filename: &str, dest: &Path) -> Result<u64>;

    /// Remove `filename`. Already-gone files are not an error.
    async fn delete(&self, filename: &str) -> Result<()>;
}

// =============================================================================
// Page Fetcher Trait (HTML over HTTP)
// =============================================================================

#[async_trait]
pub trait BasePageFetcher: Send + Sync {
    /// Fetch a page and return its body. Non-2xx responses are errors.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}
