//! NATS-backed message bus and key-value store.
//!
//! Control messages ride on core NATS subjects, which give exactly the
//! fire-and-forget semantics the control plane needs: no persistence, no
//! redelivery. The selected-links record lives in a JetStream key-value
//! bucket so the relay step can read it back later.

use anyhow::{Context, Result};
use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, info};

use super::traits::{BaseKeyValueStore, BaseMessageBus};

/// Connect to a NATS server.
pub async fn connect(host: &str, port: u16) -> Result<async_nats::Client> {
    let url = format!("nats://{}:{}", host, port);
    let client = async_nats::connect(url.as_str())
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", url))?;
    info!(url = %url, "Connected to NATS");
    Ok(client)
}

/// Message bus over core NATS pub/sub.
#[derive(Clone)]
pub struct NatsMessageBus {
    client: async_nats::Client,
}

impl NatsMessageBus {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BaseMessageBus for NatsMessageBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        self.client
            .publish(channel.to_string(), Bytes::from(message.to_string()))
            .await
            .with_context(|| format!("Failed to publish on {}", channel))?;
        // Publishes are buffered client-side; push them out before returning.
        self.client.flush().await.context("Failed to flush NATS")?;
        debug!(channel = %channel, message = %message, "Published control message");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>> {
        let subscriber = self
            .client
            .subscribe(channel.to_string())
            .await
            .with_context(|| format!("Failed to subscribe to {}", channel))?;
        info!(channel = %channel, "Subscribed to control channel");

        Ok(subscriber
            .map(|message| String::from_utf8_lossy(&message.payload).into_owned())
            .boxed())
    }
}

/// Key-value store over a JetStream bucket holding only the latest revision.
#[derive(Clone)]
pub struct NatsKeyValueStore {
    store: kv::Store,
}

impl NatsKeyValueStore {
    /// Open `bucket`, creating it on first use.
    pub async fn open(client: async_nats::Client, bucket: &str) -> Result<Self> {
        let context = jetstream::new(client);
        let store = match context.get_key_value(bucket).await {
            Ok(store) => store,
            Err(_) => context
                .create_key_value(kv::Config {
                    bucket: bucket.to_string(),
                    history: 1,
                    ..Default::default()
                })
                .await
                .with_context(|| format!("Failed to create key-value bucket {}", bucket))?,
        };
        Ok(Self { store })
    }
}

#[async_trait]
impl BaseKeyValueStore for NatsKeyValueStore {
    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let revision = self
            .store
            .put(key.to_string(), value)
            .await
            .with_context(|| format!("Failed to write key {}", key))?;
        debug!(key = %key, revision, "Key written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.store
            .get(key.to_string())
            .await
            .with_context(|| format!("Failed to read key {}", key))
    }
}
