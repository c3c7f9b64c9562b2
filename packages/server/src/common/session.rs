//! Single-slot scrape session.
//!
//! Holds the most recent [`ScrapeConfig`]. There is exactly one slot per
//! process: a second `/scrape` overwrites the first (last writer wins).
//! Concurrent sessions are not supported.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::types::ScrapeConfig;

#[derive(Debug)]
struct SessionState {
    config: Option<ScrapeConfig>,
    default_save_path: PathBuf,
}

/// Shared handle to the active scrape session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new(default_save_path: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState {
                config: None,
                default_save_path: default_save_path.into(),
            })),
        }
    }

    /// Replace the active config.
    pub fn set_config(&self, config: ScrapeConfig) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .config = Some(config);
    }

    pub fn config(&self) -> Option<ScrapeConfig> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .clone()
    }

    /// Directory files are drained into: the active config's save path, or
    /// the process default when no scrape has set one.
    pub fn save_path(&self) -> PathBuf {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &state.config {
            Some(config) if !config.save_path.trim().is_empty() => {
                PathBuf::from(&config.save_path)
            }
            _ => state.default_save_path.clone(),
        }
    }
}
