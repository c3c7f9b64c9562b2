//! Gateway-side triggers.
//!
//! These only write shared state and publish signals; the work itself happens
//! in whoever listens on the control channel.

use anyhow::Result;
use tracing::info;

use super::control::ControlMessage;
use super::selection::save_selection;
use crate::common::ScrapedLink;
use crate::kernel::ServerDeps;

/// Store the selection, then publish the relay signal.
///
/// The publish happens only after the key-value store acknowledged the
/// write, so a relay step reacting to the signal always reads this selection.
pub async fn request_relay(deps: &ServerDeps, links: &[ScrapedLink]) -> Result<()> {
    save_selection(deps.kv.as_ref(), links).await?;
    deps.bus
        .publish(&deps.settings.channel, ControlMessage::StartRelay.as_str())
        .await?;
    info!(links = links.len(), "Relay requested");
    Ok(())
}

/// Ask the orchestrator to drain the remote store.
pub async fn request_local_download(deps: &ServerDeps) -> Result<()> {
    deps.bus
        .publish(
            &deps.settings.channel,
            ControlMessage::StartLocalDownload.as_str(),
        )
        .await?;
    info!("Local download requested");
    Ok(())
}
