//! Operator CLI for the fetch relay.
//!
//! Usage:
//!   relay-cli publish "START LOCAL DOWNLOAD"
//!   relay-cli scrape https://example.com/some-release
//!   relay-cli links

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_core::domains::downloads::{load_selection, ControlMessage};
use relay_core::domains::scraping::{ExtractorConfig, LinkExtractor};
use relay_core::kernel::{
    nats, BaseMessageBus, HttpPageFetcher, NatsKeyValueStore, NatsMessageBus,
};
use relay_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Fetch relay operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a control message on the bus
    Publish {
        /// One of: "START LOCAL DOWNLOAD", "DOWNLOAD FINISHED",
        /// "START DOWNLOAD TO DMS", "START DOWNLOAD"
        message: String,
    },

    /// Resolve the download links of a page and print them as JSON
    Scrape {
        url: String,

        /// Delay between indirection pages, in milliseconds
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
    },

    /// Print the currently selected links
    Links,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,relay_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Publish { message } => {
            let control: ControlMessage = message.parse().map_err(anyhow::Error::msg)?;
            let bus_config = Config::bus_only()?;
            let client = nats::connect(&bus_config.nats_host, bus_config.nats_port).await?;
            let bus = NatsMessageBus::new(client);
            bus.publish(&bus_config.bus_channel, control.as_str()).await?;
            println!("Published {:?} on {}", control.as_str(), bus_config.bus_channel);
        }

        Commands::Scrape { url, delay_ms } => {
            let config =
                ExtractorConfig::default().with_pacing(std::time::Duration::from_millis(delay_ms));
            let extractor = LinkExtractor::new(Arc::new(HttpPageFetcher::new()?), config)?;
            let links = extractor.collect_links(&url).await?;
            println!("{}", serde_json::to_string_pretty(&links)?);
        }

        Commands::Links => {
            let bus_config = Config::bus_only()?;
            let client = nats::connect(&bus_config.nats_host, bus_config.nats_port).await?;
            let kv = NatsKeyValueStore::open(client, &bus_config.kv_bucket)
                .await
                .context("Failed to open key-value bucket")?;
            let links = load_selection(&kv).await?;
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
    }

    Ok(())
}
