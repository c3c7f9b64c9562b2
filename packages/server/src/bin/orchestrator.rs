//! Standalone download orchestrator
//!
//! Runs the drain loop without the HTTP gateway, for deployments that keep
//! the gateway and the orchestrator in separate processes (set
//! EMBEDDED_ORCHESTRATOR=false on the gateway).

use std::sync::Arc;

use anyhow::{Context, Result};
use relay_core::common::Session;
use relay_core::domains::downloads::DownloadOrchestrator;
use relay_core::kernel::{nats, NatsKeyValueStore, NatsMessageBus, WebDavAdapter};
use relay_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webdav_client::WebDavClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relay_core=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting download orchestrator");

    let config = Config::from_env().context("Failed to load configuration")?;

    let client = nats::connect(&config.nats_host, config.nats_port).await?;
    let bus = Arc::new(NatsMessageBus::new(client.clone()));
    let kv = Arc::new(NatsKeyValueStore::open(client, &config.kv_bucket).await?);
    let store = Arc::new(WebDavAdapter::new(Arc::new(WebDavClient::new(
        &config.store_url,
        &config.store_username,
        &config.store_password,
    ))));

    // The gateway records each scrape's save path on the key-value store;
    // DOWNLOAD_DIR applies until one is recorded
    let orchestrator = DownloadOrchestrator::new(
        bus,
        store,
        kv,
        Session::new(config.download_dir.clone()),
        config.bus_channel.clone(),
    );

    orchestrator.run().await
}
