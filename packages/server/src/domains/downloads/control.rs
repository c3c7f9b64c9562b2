//! Control messages exchanged on the bus.
//!
//! The wire format is a bare string compared by exact match. The set is
//! closed: anything else decodes to `None` and is ignored by subscribers.

use std::fmt;
use std::str::FromStr;

/// Signals understood on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMessage {
    /// Drain the remote store into the local save path
    StartLocalDownload,
    /// Published once a drain cycle has finished
    DownloadFinished,
    /// Begin relaying the selected links into the remote store
    StartRelay,
    /// Legacy relay trigger, still published by older tooling
    StartDownload,
}

impl ControlMessage {
    pub const ALL: [ControlMessage; 4] = [
        Self::StartLocalDownload,
        Self::DownloadFinished,
        Self::StartRelay,
        Self::StartDownload,
    ];

    /// Exact wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartLocalDownload => "START LOCAL DOWNLOAD",
            Self::DownloadFinished => "DOWNLOAD FINISHED",
            Self::StartRelay => "START DOWNLOAD TO DMS",
            Self::StartDownload => "START DOWNLOAD",
        }
    }

    /// Decode a payload. No trimming or case folding.
    pub fn parse(payload: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == payload)
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMessage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown control message: {:?}", s))
    }
}
