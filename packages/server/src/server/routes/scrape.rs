//! POST /scrape
//!
//! Stores the config in the session, records its save path for the
//! orchestrator and starts an extraction in the background. Progress goes
//! out over the WebSocket; the HTTP reply is an empty list and does not wait
//! for the extraction.

use axum::{extract::Extension, Json};
use futures::{pin_mut, StreamExt};
use tracing::{debug, info};

use super::ApiError;
use crate::common::{ScrapeConfig, ScrapedLink};
use crate::domains::downloads::store_save_path;
use crate::server::app::AppState;

pub async fn scrape_handler(
    Extension(state): Extension<AppState>,
    Json(config): Json<ScrapeConfig>,
) -> Result<Json<Vec<ScrapedLink>>, ApiError> {
    let deps = state.server_deps.clone();
    let page_url = config.page_url.clone();
    store_save_path(deps.kv.as_ref(), &config.save_path).await?;
    deps.session.set_config(config);
    info!(url = %page_url, "Scrape requested");

    tokio::spawn(async move {
        let events = deps.extractor.extract(page_url);
        pin_mut!(events);

        while let Some(progress) = events.next().await {
            let delivered = deps.progress_hub.broadcast(&progress).await;
            debug!(status = ?progress.status, delivered, "Progress broadcast");
        }
    });

    Ok(Json(Vec::new()))
}
