//! The published status snapshot.

use std::path::{Path, PathBuf};

use hypmirror_catalogue::{ContentHash, FileDescriptor};
use hypmirror_storage::StorageRecord;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicStatus {
    pub streams: Vec<StreamStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    /// The game biz.
    pub stream_id:   String,
    pub launcher_id: String,
    pub game_id:     String,
    pub game_biz:    String,
    pub game_name:   String,
    /// Milliseconds since the epoch of the last catalogue change.
    pub updated_at:  Option<i64>,
    pub files:       Vec<PublicFileInfo>,
}

/// A catalogue entry with what storage says about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFileInfo {
    pub name:                String,
    pub content_hash:        ContentHash,
    pub url:                 Url,
    pub size:                u64,
    pub required_free_space: u64,
    pub tags:                Vec<String>,
    #[serde(flatten)]
    pub record:              StorageRecord,
}

impl PublicFileInfo {
    pub fn new(file: &FileDescriptor, record: StorageRecord) -> Self {
        Self {
            name: file.name.clone(),
            content_hash: file.content_hash.clone(),
            url: file.source.clone(),
            size: file.size,
            required_free_space: file.required_free_space,
            tags: file.tags.clone(),
            record,
        }
    }
}

/// Writes the snapshot atomically, and only when it differs from the last
/// one written.
#[derive(Debug, Default)]
pub struct StatusPublisher {
    path: Option<PathBuf>,
    last: Option<PublicStatus>,
}

impl StatusPublisher {
    pub fn new(path: Option<PathBuf>) -> Self { Self { path, last: None } }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn last(&self) -> Option<&PublicStatus> { self.last.as_ref() }

    /// Returns whether the snapshot changed. An unchanged snapshot touches
    /// nothing on disk.
    pub fn publish(&mut self, status: PublicStatus) -> Result<bool> {
        if self.last.as_ref() == Some(&status) {
            return Ok(false);
        }

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                hypmirror_fs::ensure_dir(parent)?;
            }
            let json = serde_json::to_vec(&status)?;
            hypmirror_fs::atomic_write(path, &json)?;
            tracing::info!(path = %path.display(), streams = status.streams.len(), "status published");
        }

        self.last = Some(status);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypmirror_storage::FileStatus;

    fn descriptor() -> FileDescriptor {
        FileDescriptor {
            name:                "game.zip".to_string(),
            content_hash:        ContentHash::new("abc").unwrap(),
            source:              "https://cdn.example/game.zip".parse().unwrap(),
            size:                5,
            required_free_space: 9,
            tags:                vec!["res:game".to_string()],
        }
    }

    fn status(record: StorageRecord) -> PublicStatus {
        PublicStatus {
            streams: vec![StreamStatus {
                stream_id:   "nap_global".to_string(),
                launcher_id: "VYTpXlbWo8".to_string(),
                game_id:     "U5hbdsT9W7".to_string(),
                game_biz:    "nap_global".to_string(),
                game_name:   "Zenless Zone Zero".to_string(),
                updated_at:  Some(1_700_000_000_000),
                files:       vec![PublicFileInfo::new(&descriptor(), record)],
            }],
        }
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(status(StorageRecord::downloading("abc/game.zip", Some(0.5)))).unwrap();
        let file = &json["streams"][0]["files"][0];
        assert_eq!(json["streams"][0]["streamId"], "nap_global");
        assert_eq!(json["streams"][0]["updatedAt"], 1_700_000_000_000i64);
        assert_eq!(file["contentHash"], "abc");
        assert_eq!(file["url"], "https://cdn.example/game.zip");
        assert_eq!(file["requiredFreeSpace"], 9);
        assert_eq!(file["status"], "DOWNLOADING");
        assert_eq!(file["publicPath"], "abc/game.zip");
        assert_eq!(file["progress"], 0.5);
    }

    #[test]
    fn test_error_file_omits_path() {
        let json = serde_json::to_value(status(StorageRecord::error())).unwrap();
        let file = json["streams"][0]["files"][0].as_object().unwrap();
        assert_eq!(file["status"], "ERROR");
        assert!(!file.contains_key("publicPath"));
        assert!(!file.contains_key("progress"));
    }

    #[test]
    fn test_publish_only_when_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("status.json");
        let mut publisher = StatusPublisher::new(Some(path.clone()));

        assert!(publisher.publish(status(StorageRecord::error())).unwrap());
        let written: PublicStatus = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written.streams[0].files[0].record.status, FileStatus::Error);

        std::fs::remove_file(&path).unwrap();
        assert!(!publisher.publish(status(StorageRecord::error())).unwrap());
        assert!(!path.exists());

        assert!(publisher.publish(status(StorageRecord::ready("abc/game.zip"))).unwrap());
        assert!(path.exists());
    }
}
