//! Built-in HTTP downloader with a status sidecar next to the content.
//!
//! ```text
//! <root>/<hash>/<name>        content, only ever present fully verified
//! <root>/<hash>/<name>.part   staging file of a running or interrupted transfer
//! <root>/<hash>/.status       READY | DOWNLOADING | ERROR
//! ```
//!
//! The sidecar outlives the process. A `DOWNLOADING` sidecar that no live
//! transfer of this instance backs was left by an earlier run and reads as
//! `Error`; the next download resumes its staging file.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use hypmirror_catalogue::{FileDescriptor, FileKey};
use hypmirror_fetch::{FetchOptions, Fetcher, HttpClient};
use hypmirror_verify::{Md5Hasher, decode_hex_digest};

use crate::backend::FileStorage;
use crate::error::{Result, StorageError};
use crate::layout::Layout;
use crate::record::{FileStatus, StorageRecord};
use crate::registry::TransferRegistry;

const STATUS_FILE: &str = ".status";

pub struct Durable<C: HttpClient> {
    layout:   Layout,
    fetcher:  Arc<Fetcher<C>>,
    registry: Arc<TransferRegistry>,
}

impl<C: HttpClient + 'static> Durable<C> {
    pub fn new(layout: Layout, fetcher: Fetcher<C>) -> Self {
        Self {
            layout,
            fetcher: Arc::new(fetcher),
            registry: TransferRegistry::new(),
        }
    }

    pub fn layout(&self) -> &Layout { &self.layout }

    pub fn registry(&self) -> &TransferRegistry { &self.registry }

    fn status_path(&self, key: &FileKey) -> PathBuf { self.layout.dir(key).join(STATUS_FILE) }

    /// Compare what the server reports against the catalogue before any body
    /// is transferred.
    async fn check_remote(&self, file: &FileDescriptor) -> Result<()> {
        let meta = self.fetcher.probe(file.source.as_str()).await?;
        if let Some(total) = meta.total_bytes
            && total != file.size
        {
            return Err(StorageError::SizeMismatch {
                expected: file.size,
                actual:   total,
            });
        }
        if let Some(name) = meta.file_name
            && name != file.name
        {
            return Err(StorageError::NameMismatch {
                expected: file.name.clone(),
                actual:   name,
            });
        }
        Ok(())
    }
}

async fn write_status(path: PathBuf, status: FileStatus) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        hypmirror_fs::atomic_write(&path, status.as_str().as_bytes())
    })
    .await
    .map_err(io::Error::other)??;
    Ok(())
}

fn md5_checksum(file: &FileDescriptor) -> Result<[u8; 16]> {
    let digest = decode_hex_digest(file.content_hash.as_str(), Md5Hasher::OUTPUT_LEN)?;
    let mut checksum = [0u8; 16];
    checksum.copy_from_slice(&digest);
    Ok(checksum)
}

impl<C: HttpClient + 'static> FileStorage for Durable<C> {
    async fn file_info(&self, key: &FileKey) -> Result<StorageRecord> {
        let status = match tokio::fs::read_to_string(self.status_path(key)).await {
            Ok(text) => text.parse().unwrap_or_else(|other: String| {
                tracing::warn!(hash = %key.content_hash, status = %other, "unrecognised status sidecar");
                FileStatus::Error
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StorageError::NotFound(key.clone())),
            Err(e) => return Err(e.into()),
        };

        match status {
            FileStatus::Ready => match tokio::fs::metadata(self.layout.content(key)).await {
                Ok(meta) if meta.is_file() => Ok(StorageRecord::ready(self.layout.public_path(key))),
                Ok(_) => Ok(StorageRecord::error()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(hash = %key.content_hash, name = %key.name, "marked ready but content is missing");
                    Ok(StorageRecord::error())
                }
                Err(e) => Err(e.into()),
            },
            FileStatus::Downloading => match self.registry.progress(&key.content_hash).await {
                Some(progress) => Ok(StorageRecord::downloading(self.layout.public_path(key), progress.get())),
                None => {
                    tracing::debug!(hash = %key.content_hash, name = %key.name, "stale downloading marker");
                    Ok(StorageRecord::error())
                }
            },
            FileStatus::Error => Ok(StorageRecord::error()),
        }
    }

    async fn download_remote_file(&self, file: &FileDescriptor) -> Result<()> {
        let Some(_admission) = self.registry.admit(&file.content_hash).await else {
            return Ok(());
        };

        let key = file.key();
        let checksum = md5_checksum(file)?;
        tokio::fs::create_dir_all(self.layout.dir(&key)).await?;

        let status_path = self.status_path(&key);
        write_status(status_path.clone(), FileStatus::Downloading).await?;

        if let Err(e) = self.check_remote(file).await {
            write_status(status_path, FileStatus::Error).await?;
            return Err(e);
        }

        let fetcher = Arc::clone(&self.fetcher);
        let url = file.source.to_string();
        let destination = self.layout.content(&key);
        let size = file.size;
        let started = self
            .registry
            .start(file.content_hash.clone(), move |progress| {
                let options = FetchOptions::default()
                    .checksum(Some(checksum))
                    .expected_size(Some(size))
                    .on_progress(move |p| progress.set(p.fraction()));

                async move {
                    let outcome = match fetcher.fetch(&url, &destination, options).await {
                        Ok(_) => {
                            tracing::info!(hash = %key.content_hash, name = %key.name, "download complete");
                            FileStatus::Ready
                        }
                        Err(e) => {
                            let e = StorageError::from(e);
                            tracing::warn!(hash = %key.content_hash, name = %key.name, error = %e, "download failed");
                            FileStatus::Error
                        }
                    };
                    if let Err(e) = write_status(status_path, outcome).await {
                        tracing::warn!(hash = %key.content_hash, error = %e, "failed to record transfer outcome");
                    }
                }
            })
            .await;

        if started {
            tracing::info!(hash = %file.content_hash, name = %file.name, "download started");
        }
        Ok(())
    }

    async fn remove_file(&self, key: &FileKey) -> Result<()> {
        self.registry.cancel(&key.content_hash).await;

        // The directory belongs to the hash; copies stored under earlier
        // names go with it.
        let dir = self.layout.dir(key);
        let removed = tokio::task::spawn_blocking(move || hypmirror_fs::remove_dir_all_if_exists(&dir))
            .await
            .map_err(io::Error::other)??;

        if removed {
            tracing::info!(hash = %key.content_hash, name = %key.name, "removed");
        }
        Ok(())
    }
}
