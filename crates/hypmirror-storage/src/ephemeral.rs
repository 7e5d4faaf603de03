//! In-memory backend that pretends to download.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hypmirror_catalogue::{ContentHash, FileDescriptor, FileKey};
use rand::Rng;
use tokio::sync::Mutex;

use crate::backend::FileStorage;
use crate::error::{Result, StorageError};
use crate::record::{FileStatus, StorageRecord};
use crate::registry::TransferRegistry;

/// Reported while a simulated transfer is running.
pub const SIMULATED_PROGRESS: f64 = 0.66;

/// Upper bound of the random completion delay.
pub const MAX_RANDOM_DELAY: Duration = Duration::from_secs(100);

/// How long a simulated transfer takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedDelay {
    /// Uniform in `[0, MAX_RANDOM_DELAY]` per transfer.
    Random,
    Fixed(Duration),
}

impl SimulatedDelay {
    fn sample(self) -> Duration {
        match self {
            Self::Random => {
                let millis = rand::thread_rng().gen_range(0..=MAX_RANDOM_DELAY.as_millis() as u64);
                Duration::from_millis(millis)
            }
            Self::Fixed(delay) => delay,
        }
    }
}

/// Keeps statuses in memory and flips `Downloading` to `Ready` after a delay.
/// Nothing touches the filesystem or the network.
pub struct Ephemeral {
    files:    Arc<Mutex<HashMap<ContentHash, FileStatus>>>,
    delay:    SimulatedDelay,
    registry: Arc<TransferRegistry>,
}

impl Ephemeral {
    pub fn new(delay: SimulatedDelay) -> Self {
        Self {
            files: Arc::default(),
            delay,
            registry: TransferRegistry::new(),
        }
    }

    pub fn registry(&self) -> &TransferRegistry { &self.registry }

    fn public_path(key: &FileKey) -> String { format!("/dummy/{}/{}", key.content_hash, key.name) }
}

impl Default for Ephemeral {
    fn default() -> Self { Self::new(SimulatedDelay::Random) }
}

impl FileStorage for Ephemeral {
    async fn file_info(&self, key: &FileKey) -> Result<StorageRecord> {
        let status = self.files.lock().await.get(&key.content_hash).copied();
        match status {
            None => Err(StorageError::NotFound(key.clone())),
            Some(FileStatus::Ready) => Ok(StorageRecord::ready(Self::public_path(key))),
            Some(FileStatus::Downloading) => {
                Ok(StorageRecord::downloading(Self::public_path(key), Some(SIMULATED_PROGRESS)))
            }
            Some(FileStatus::Error) => Ok(StorageRecord::error()),
        }
    }

    async fn download_remote_file(&self, file: &FileDescriptor) -> Result<()> {
        let hash = file.content_hash.clone();
        let Some(_admission) = self.registry.admit(&file.content_hash).await else {
            return Ok(());
        };

        // Marked before spawning so a zero delay cannot be overwritten.
        self.files.lock().await.insert(hash.clone(), FileStatus::Downloading);

        let delay = self.delay.sample();
        let files = Arc::clone(&self.files);
        let name = file.name.clone();
        let task_hash = hash.clone();
        let started = self
            .registry
            .start(hash, move |_| async move {
                tokio::time::sleep(delay).await;
                files.lock().await.insert(task_hash.clone(), FileStatus::Ready);
                tracing::info!(hash = %task_hash, %name, "simulated transfer ready");
            })
            .await;

        if started {
            tracing::info!(hash = %file.content_hash, name = %file.name, ?delay, "simulated transfer scheduled");
        }
        Ok(())
    }

    async fn remove_file(&self, key: &FileKey) -> Result<()> {
        self.registry.cancel(&key.content_hash).await;
        if self.files.lock().await.remove(&key.content_hash).is_some() {
            tracing::info!(hash = %key.content_hash, name = %key.name, "removed");
        }
        Ok(())
    }
}
