//! Download orchestrator.
//!
//! Listens on the control channel. `START LOCAL DOWNLOAD` triggers a drain
//! cycle: list the remote store, then for each file download it into the
//! save path and delete it remotely, then announce `DOWNLOAD FINISHED`.
//! Messages are handled one at a time, so two drains never overlap.
//!
//! The save path is the one the latest scrape recorded on the key-value
//! store, so gateway and orchestrator may live in different processes. With
//! nothing recorded the session's path applies.
//!
//! Failure policy is fail-fast: the first listing or transfer error aborts
//! the cycle, nothing is retried, and the orchestrator goes back to waiting
//! for the next signal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::control::ControlMessage;
use super::selection::load_save_path;
use crate::common::Session;
use crate::kernel::{BaseKeyValueStore, BaseMessageBus, BaseRemoteStore, ServerDeps};

#[derive(Debug, Error)]
pub enum DrainError {
    #[error("listing remote store failed: {reason:#}")]
    Listing { reason: anyhow::Error },

    #[error("cannot read the recorded save path: {reason:#}")]
    SavePathLookup { reason: anyhow::Error },

    #[error("cannot prepare save path {}: {source}", path.display())]
    SavePath {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("transfer of {filename} failed: {reason:#}")]
    Transfer {
        filename: String,
        reason: anyhow::Error,
    },

    #[error("failed to announce completion: {reason:#}")]
    Notify { reason: anyhow::Error },
}

/// Outcome of a successful drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Files moved, in listing order
    pub files: Vec<String>,
    pub bytes: u64,
}

pub struct DownloadOrchestrator {
    bus: Arc<dyn BaseMessageBus>,
    store: Arc<dyn BaseRemoteStore>,
    kv: Arc<dyn BaseKeyValueStore>,
    /// Fallback save path when no scrape recorded one
    session: Session,
    channel: String,
}

impl DownloadOrchestrator {
    pub fn new(
        bus: Arc<dyn BaseMessageBus>,
        store: Arc<dyn BaseRemoteStore>,
        kv: Arc<dyn BaseKeyValueStore>,
        session: Session,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            store,
            kv,
            session,
            channel: channel.into(),
        }
    }

    pub fn from_deps(deps: &ServerDeps) -> Self {
        Self::new(
            deps.bus.clone(),
            deps.remote_store.clone(),
            deps.kv.clone(),
            deps.session.clone(),
            deps.settings.channel.clone(),
        )
    }

    /// Run the subscribe loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(error = %e, "Download orchestrator exited with error");
            }
        })
    }

    /// Subscribe and handle control messages until the subscription ends.
    pub async fn run(&self) -> Result<()> {
        let mut messages = self.bus.subscribe(&self.channel).await?;
        info!(channel = %self.channel, "Orchestrator waiting for control messages");

        while let Some(payload) = messages.next().await {
            self.handle(&payload).await;
        }

        anyhow::bail!("subscription to {} closed", self.channel)
    }

    /// Handle one payload. Returns the drain result when it triggered one.
    pub async fn handle(&self, payload: &str) -> Option<Result<DrainReport, DrainError>> {
        match ControlMessage::parse(payload) {
            Some(ControlMessage::StartLocalDownload) => {
                let result = self.drain().await;
                match &result {
                    Ok(report) => info!(
                        files = report.files.len(),
                        bytes = report.bytes,
                        "Drain cycle finished"
                    ),
                    Err(e) => error!(error = %e, "Drain cycle aborted"),
                }
                Some(result)
            }
            Some(other) => {
                debug!(message = %other, "Ignoring control message");
                None
            }
            None => {
                debug!(payload = %payload, "Ignoring unrecognized payload");
                None
            }
        }
    }

    /// One drain cycle.
    pub async fn drain(&self) -> Result<DrainReport, DrainError> {
        let save_path = self.save_path().await?;

        let files = self
            .store
            .list()
            .await
            .map_err(|reason| DrainError::Listing { reason })?;
        info!(
            count = files.len(),
            path = %save_path.display(),
            "Draining remote store"
        );

        tokio::fs::create_dir_all(&save_path)
            .await
            .map_err(|source| DrainError::SavePath {
                path: save_path.clone(),
                source,
            })?;

        let mut report = DrainReport::default();
        for filename in files {
            let dest = local_destination(&save_path, &filename).map_err(|reason| {
                DrainError::Transfer {
                    filename: filename.clone(),
                    reason,
                }
            })?;

            // Delete strictly after the file is on disk
            let bytes = self
                .store
                .download(&filename, &dest)
                .await
                .map_err(|reason| DrainError::Transfer {
                    filename: filename.clone(),
                    reason,
                })?;
            self.store
                .delete(&filename)
                .await
                .map_err(|reason| DrainError::Transfer {
                    filename: filename.clone(),
                    reason,
                })?;

            debug!(filename = %filename, bytes, "File moved to local storage");
            report.bytes += bytes;
            report.files.push(filename);
        }

        self.bus
            .publish(&self.channel, ControlMessage::DownloadFinished.as_str())
            .await
            .map_err(|reason| DrainError::Notify { reason })?;

        Ok(report)
    }

    /// Save path recorded by the latest scrape, else the session's.
    async fn save_path(&self) -> Result<PathBuf, DrainError> {
        match load_save_path(self.kv.as_ref()).await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Ok(self.session.save_path()),
            Err(reason) => Err(DrainError::SavePathLookup { reason }),
        }
    }
}

/// Join a remote file name onto the save path, refusing anything that
/// would land outside it.
fn local_destination(save_path: &Path, filename: &str) -> Result<PathBuf> {
    let name = Path::new(filename);
    if filename.is_empty() || name.file_name() != Some(name.as_os_str()) {
        anyhow::bail!("refusing unsafe file name {:?}", filename);
    }
    Ok(save_path.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_destination() {
        let base = Path::new("/downloads");
        assert_eq!(
            local_destination(base, "a.zip").unwrap(),
            PathBuf::from("/downloads/a.zip")
        );
        assert!(local_destination(base, "../etc/passwd").is_err());
        assert!(local_destination(base, "sub/a.zip").is_err());
        assert!(local_destination(base, "..").is_err());
        assert!(local_destination(base, "").is_err());
    }
}
