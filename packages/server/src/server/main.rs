// Main entry point for the gateway

use std::sync::Arc;

use anyhow::{Context, Result};
use relay_core::common::Session;
use relay_core::domains::downloads::DownloadOrchestrator;
use relay_core::kernel::{
    nats, HttpPageFetcher, NatsKeyValueStore, NatsMessageBus, RelaySettings, ServerDeps,
    WebDavAdapter,
};
use relay_core::{server::build_app, Config};
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
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting fetch relay gateway");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to the message bus
    let client = nats::connect(&config.nats_host, config.nats_port).await?;
    let bus = Arc::new(NatsMessageBus::new(client.clone()));
    let kv = Arc::new(NatsKeyValueStore::open(client, &config.kv_bucket).await?);

    let remote_store = Arc::new(WebDavAdapter::new(Arc::new(WebDavClient::new(
        &config.store_url,
        &config.store_username,
        &config.store_password,
    ))));
    let page_fetcher = Arc::new(HttpPageFetcher::new()?);

    let mut settings = RelaySettings {
        channel: config.bus_channel.clone(),
        ws_idle_timeout: config.ws_idle_timeout,
        ..Default::default()
    };
    settings.extractor.pacing = config.scrape_delay;

    let deps = ServerDeps::new(
        bus,
        kv,
        remote_store,
        page_fetcher,
        Session::new(config.download_dir.clone()),
        settings,
    )?;

    if config.embedded_orchestrator {
        DownloadOrchestrator::from_deps(&deps).spawn();
        tracing::info!(channel = %config.bus_channel, "Embedded orchestrator started");
    }

    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Progress WebSocket: ws://localhost:{}/ws", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
