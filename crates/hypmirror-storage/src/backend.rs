use std::future::Future;
use std::path::Path;

use hypmirror_catalogue::{FileDescriptor, FileKey};
use hypmirror_fetch::{Fetcher, ReqwestClient};

use crate::aria2::Aria2;
use crate::config::StorageConfig;
use crate::durable::Durable;
use crate::ephemeral::{Ephemeral, SimulatedDelay};
use crate::error::{Result, StorageError};
use crate::layout::Layout;
use crate::record::StorageRecord;

/// Per-file storage contract shared by every backend.
///
/// Completion of a transfer is only ever observed through
/// [`FileStorage::file_info`]; nothing is pushed to the caller.
pub trait FileStorage: Send + Sync {
    /// Read-only status lookup. A key the backend knows nothing about is
    /// [`StorageError::NotFound`](crate::StorageError::NotFound).
    fn file_info(&self, key: &FileKey) -> impl Future<Output = Result<StorageRecord>> + Send;

    /// Start fetching `file`; returns once the transfer is accepted.
    ///
    /// Does nothing while a live transfer for the same hash exists.
    fn download_remote_file(&self, file: &FileDescriptor) -> impl Future<Output = Result<()>> + Send;

    /// Cancel any in-flight transfer, wait for it, then delete everything
    /// stored for `key`. Removing something absent succeeds.
    fn remove_file(&self, key: &FileKey) -> impl Future<Output = Result<()>> + Send;
}

/// The backend selected by configuration.
pub enum StorageBackend {
    Ephemeral(Ephemeral),
    Durable(Durable<ReqwestClient>),
    Delegated(Aria2),
}

impl StorageBackend {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let backend = match config {
            StorageConfig::Dummy { delay_ms } => {
                let delay = match delay_ms {
                    Some(ms) => SimulatedDelay::Fixed(std::time::Duration::from_millis(*ms)),
                    None => SimulatedDelay::Random,
                };
                Self::Ephemeral(Ephemeral::new(delay))
            }
            StorageConfig::Local { root, url } => {
                require_root(root)?;
                let layout = Layout::new(root, url.clone());
                Self::Durable(Durable::new(layout, Fetcher::new(ReqwestClient::new())))
            }
            StorageConfig::Aria2 { root, url, program } => {
                require_root(root)?;
                let layout = Layout::new(root, url.clone());
                let mut aria2 = Aria2::new(layout);
                if let Some(program) = program {
                    aria2 = aria2.program(program);
                }
                Self::Delegated(aria2)
            }
        };
        tracing::info!(backend = backend.kind(), "storage backend ready");
        Ok(backend)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ephemeral(_) => "dummy",
            Self::Durable(_) => "local",
            Self::Delegated(_) => "aria2",
        }
    }

    /// Number of transfers this backend is currently running.
    pub async fn active_transfers(&self) -> usize {
        match self {
            Self::Ephemeral(s) => s.registry().active_transfers().await,
            Self::Durable(s) => s.registry().active_transfers().await,
            Self::Delegated(s) => s.registry().active_transfers().await,
        }
    }
}

fn require_root(root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(StorageError::Config("storage root must not be empty".to_string()));
    }
    Ok(())
}

impl FileStorage for StorageBackend {
    async fn file_info(&self, key: &FileKey) -> Result<StorageRecord> {
        match self {
            Self::Ephemeral(s) => s.file_info(key).await,
            Self::Durable(s) => s.file_info(key).await,
            Self::Delegated(s) => s.file_info(key).await,
        }
    }

    async fn download_remote_file(&self, file: &FileDescriptor) -> Result<()> {
        match self {
            Self::Ephemeral(s) => s.download_remote_file(file).await,
            Self::Durable(s) => s.download_remote_file(file).await,
            Self::Delegated(s) => s.download_remote_file(file).await,
        }
    }

    async fn remove_file(&self, key: &FileKey) -> Result<()> {
        match self {
            Self::Ephemeral(s) => s.remove_file(key).await,
            Self::Durable(s) => s.remove_file(key).await,
            Self::Delegated(s) => s.remove_file(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let dummy = StorageBackend::from_config(&StorageConfig::Dummy { delay_ms: Some(0) }).unwrap();
        assert_eq!(dummy.kind(), "dummy");

        let aria2 = StorageConfig::Aria2 {
            root:    PathBuf::from("mirror"),
            url:     None,
            program: Some(PathBuf::from("/usr/local/bin/aria2c")),
        };
        assert_eq!(StorageBackend::from_config(&aria2).unwrap().kind(), "aria2");
    }

    #[test]
    fn test_from_config_rejects_empty_root() {
        let local = StorageConfig::Local {
            root: PathBuf::new(),
            url:  None,
        };
        assert!(matches!(StorageBackend::from_config(&local), Err(StorageError::Config(_))));
    }
}
