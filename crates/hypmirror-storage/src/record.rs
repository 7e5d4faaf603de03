use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-file download state.
///
/// `Error` is also the state of anything unknown; there is no terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    #[default]
    Error,
    Ready,
    Downloading,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Ready => "READY",
            Self::Downloading => "DOWNLOADING",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ERROR" => Ok(Self::Error),
            "READY" => Ok(Self::Ready),
            "DOWNLOADING" => Ok(Self::Downloading),
            other => Err(other.to_string()),
        }
    }
}

/// What a backend knows about one content hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub status:      FileStatus,
    /// Where clients can fetch the file; absent in the `Error` state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
    /// Fraction in `[0, 1]`, only while downloading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress:    Option<f64>,
}

impl StorageRecord {
    pub fn error() -> Self { Self::default() }

    pub fn ready(public_path: impl Into<String>) -> Self {
        Self {
            status:      FileStatus::Ready,
            public_path: Some(public_path.into()),
            progress:    None,
        }
    }

    pub fn downloading(public_path: impl Into<String>, progress: Option<f64>) -> Self {
        Self {
            status:      FileStatus::Downloading,
            public_path: Some(public_path.into()),
            progress:    progress.map(|p| p.clamp(0.0, 1.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_form() {
        assert_eq!(serde_json::to_string(&FileStatus::Downloading).unwrap(), "\"DOWNLOADING\"");
        assert_eq!("READY\n".parse::<FileStatus>(), Ok(FileStatus::Ready));
        assert!("done".parse::<FileStatus>().is_err());
    }

    #[test]
    fn test_error_record_has_no_path() {
        let json = serde_json::to_value(StorageRecord::error()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ERROR"}));
    }

    #[test]
    fn test_progress_is_clamped() {
        let record = StorageRecord::downloading("a/b", Some(1.5));
        assert_eq!(record.progress, Some(1.0));
    }
}
