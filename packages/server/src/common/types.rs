// Common types shared by the gateway, the extractor and the orchestrator
//
// These are the JSON shapes that travel over HTTP, the WebSocket progress
// stream and the selected-links record.

use serde::{Deserialize, Serialize};

/// Parameters of one scrape request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Page that lists the downloads
    #[serde(rename = "url", alias = "pageUrl")]
    pub page_url: String,
    /// Local directory the orchestrator drains files into
    #[serde(rename = "save_path", alias = "localSavePath")]
    pub save_path: String,
}

/// A resolved direct-download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedLink {
    pub filename: String,
    pub url: String,
}

impl ScrapedLink {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }
}

/// Phase of a scrape progress event.
///
/// Unknown tags deserialize to `Unknown` so older clients keep working when
/// new phases appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Started,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

/// One event of the scrape progress stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeProgress {
    pub status: ProgressStatus,
    #[serde(default)]
    pub current: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Only present on `completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<ScrapedLink>>,
}

impl ScrapeProgress {
    pub fn started(total: usize) -> Self {
        Self {
            status: ProgressStatus::Started,
            current: 0,
            total,
            filename: None,
            message: Some("Starting to extract download links".to_string()),
            links: None,
        }
    }

    pub fn processing(current: usize, total: usize, filename: &str) -> Self {
        Self {
            status: ProgressStatus::Processing,
            current,
            total,
            filename: Some(filename.to_string()),
            message: Some(format!("Processing {}/{}: {}", current, total, filename)),
            links: None,
        }
    }

    pub fn error(current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Error,
            current,
            total,
            filename: None,
            message: Some(message.into()),
            links: None,
        }
    }

    pub fn completed(total: usize, links: Vec<ScrapedLink>) -> Self {
        Self {
            status: ProgressStatus::Completed,
            current: total,
            total,
            filename: None,
            message: Some(format!("Completed extracting {} links", links.len())),
            links: Some(links),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// `completed`, or an `error` raised before any link was counted.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            ProgressStatus::Completed => true,
            ProgressStatus::Error => self.total == 0,
            _ => false,
        }
    }
}
