//! Error types for the WebDAV client.

use thiserror::Error;

/// Result type for WebDAV client operations.
pub type Result<T> = std::result::Result<T, WebDavError>;

/// WebDAV client errors.
#[derive(Debug, Error)]
pub enum WebDavError {
    /// Directory listing answered with something other than 207 Multi-Status
    #[error("listing failed with status {status}")]
    Listing { status: u16 },

    /// Non-success response on a transfer (GET/DELETE)
    #[error("{method} {url} returned status {status}")]
    Api {
        method: &'static str,
        url: String,
        status: u16,
    },

    /// Transport failure (connection refused, reset, TLS, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Multi-status body could not be parsed
    #[error("invalid multistatus body: {0}")]
    Parse(String),

    /// Writing the downloaded file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebDavError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Listing { status } | Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::Io(_) => None,
        }
    }
}
