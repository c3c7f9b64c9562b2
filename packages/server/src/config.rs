use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub nats_host: String,
    pub nats_port: u16,
    /// Control channel shared by gateway, relay step and orchestrator
    pub bus_channel: String,
    pub kv_bucket: String,
    pub store_url: String,
    pub store_username: String,
    pub store_password: String,
    /// Save path used until a scrape sets one
    pub download_dir: PathBuf,
    pub scrape_delay: Duration,
    pub ws_idle_timeout: Duration,
    /// Run the download orchestrator inside the gateway process
    pub embedded_orchestrator: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            nats_host: env::var("NATS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            nats_port: env::var("NATS_PORT")
                .unwrap_or_else(|_| "4222".to_string())
                .parse()
                .context("NATS_PORT must be a valid number")?,
            bus_channel: env::var("BUS_CHANNEL").unwrap_or_else(|_| "relay".to_string()),
            kv_bucket: env::var("KV_BUCKET").unwrap_or_else(|_| "relay".to_string()),
            store_url: env::var("STORE_URL").context("STORE_URL must be set")?,
            store_username: env::var("STORE_USERNAME")
                .context("STORE_USERNAME must be set")?,
            store_password: env::var("STORE_PASSWORD")
                .context("STORE_PASSWORD must be set")?,
            download_dir: env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            scrape_delay: Duration::from_millis(
                env::var("SCRAPE_DELAY_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .context("SCRAPE_DELAY_MS must be a number of milliseconds")?,
            ),
            ws_idle_timeout: Duration::from_secs(
                env::var("WS_IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("WS_IDLE_TIMEOUT_SECS must be a number of seconds")?,
            ),
            embedded_orchestrator: parse_flag(
                &env::var("EMBEDDED_ORCHESTRATOR").unwrap_or_else(|_| "true".to_string()),
            )
            .context("EMBEDDED_ORCHESTRATOR must be true or false")?,
        })
    }

    pub fn bus_only() -> Result<BusConfig> {
        let _ = dotenv();

        Ok(BusConfig {
            nats_host: env::var("NATS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            nats_port: env::var("NATS_PORT")
                .unwrap_or_else(|_| "4222".to_string())
                .parse()
                .context("NATS_PORT must be a valid number")?,
            bus_channel: env::var("BUS_CHANNEL").unwrap_or_else(|_| "relay".to_string()),
            kv_bucket: env::var("KV_BUCKET").unwrap_or_else(|_| "relay".to_string()),
        })
    }
}

/// Subset of [`Config`] for tools that only talk to the bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub nats_host: String,
    pub nats_port: u16,
    pub bus_channel: String,
    pub kv_bucket: String,
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value {:?}", other),
    }
}
