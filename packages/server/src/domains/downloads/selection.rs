//! Shared records on the key-value store.
//!
//! One well-known key holds the JSON array of links the user picked, another
//! the save path of the latest scrape so an orchestrator in another process
//! drains into the directory the user chose. Last write wins; no versioning,
//! no expiry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::common::ScrapedLink;
use crate::kernel::BaseKeyValueStore;

/// Key the relay step reads the selection from.
pub const SELECTED_LINKS_KEY: &str = "LINKS_TO_DOWNLOAD";

/// Overwrite the selection. Returns once the store acknowledged the write.
pub async fn save_selection(kv: &dyn BaseKeyValueStore, links: &[ScrapedLink]) -> Result<()> {
    let payload = serde_json::to_vec(links).context("Failed to encode selected links")?;
    kv.put(SELECTED_LINKS_KEY, Bytes::from(payload)).await
}

/// Current selection; empty if nothing was ever saved.
pub async fn load_selection(kv: &dyn BaseKeyValueStore) -> Result<Vec<ScrapedLink>> {
    match kv.get(SELECTED_LINKS_KEY).await? {
        Some(payload) => {
            serde_json::from_slice(&payload).context("Selected-links record is not valid JSON")
        }
        None => Ok(Vec::new()),
    }
}

/// Key holding the save path of the latest scrape.
pub const SAVE_PATH_KEY: &str = "SAVE_PATH";

/// Record the save path. A blank path clears it.
pub async fn store_save_path(kv: &dyn BaseKeyValueStore, path: &str) -> Result<()> {
    kv.put(SAVE_PATH_KEY, Bytes::from(path.trim().to_string())).await
}

/// Latest recorded save path, `None` when unset or blank.
pub async fn load_save_path(kv: &dyn BaseKeyValueStore) -> Result<Option<PathBuf>> {
    let Some(raw) = kv.get(SAVE_PATH_KEY).await? else {
        return Ok(None);
    };
    let path = String::from_utf8(raw.to_vec()).context("Save path is not valid UTF-8")?;
    if path.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(path)))
}
