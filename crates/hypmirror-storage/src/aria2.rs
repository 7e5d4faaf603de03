//! Backend that hands each transfer to an `aria2c` process.
//!
//! aria2 keeps a `<name>.aria2` control file next to the content while a
//! transfer is incomplete and deletes it once the download has passed its
//! integrity check, so the filesystem alone says whether content is complete.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use hypmirror_catalogue::{FileDescriptor, FileKey};
use tokio::process::Command;

use crate::backend::FileStorage;
use crate::error::{Result, StorageError};
use crate::layout::Layout;
use crate::record::StorageRecord;
use crate::registry::TransferRegistry;

const CONTROL_SUFFIX: &str = ".aria2";

pub struct Aria2 {
    layout:       Layout,
    program:      PathBuf,
    /// Inserted before the generated arguments.
    leading_args: Vec<OsString>,
    registry:     Arc<TransferRegistry>,
}

impl Aria2 {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            program: PathBuf::from("aria2c"),
            leading_args: Vec::new(),
            registry: TransferRegistry::new(),
        }
    }

    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn layout(&self) -> &Layout { &self.layout }

    pub fn registry(&self) -> &TransferRegistry { &self.registry }

    fn command(&self, file: &FileDescriptor, dir: &std::path::Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg("--check-integrity=true")
            .arg(format!("--checksum=md5={}", file.content_hash))
            .arg("-d")
            .arg(dir)
            .arg("-o")
            .arg(&file.name)
            .arg(file.source.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

async fn exists(path: &std::path::Path) -> io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

impl FileStorage for Aria2 {
    async fn file_info(&self, key: &FileKey) -> Result<StorageRecord> {
        // aria2 creates the control file some time after it starts writing.
        if self.registry.is_live(&key.content_hash).await {
            return Ok(StorageRecord::downloading(self.layout.public_path(key), None));
        }

        if !exists(&self.layout.content(key)).await? {
            return Err(StorageError::NotFound(key.clone()));
        }

        if exists(&self.layout.with_suffix(key, CONTROL_SUFFIX)).await? {
            tracing::debug!(hash = %key.content_hash, name = %key.name, "control file without a running process");
            return Ok(StorageRecord::error());
        }
        Ok(StorageRecord::ready(self.layout.public_path(key)))
    }

    async fn download_remote_file(&self, file: &FileDescriptor) -> Result<()> {
        let Some(_admission) = self.registry.admit(&file.content_hash).await else {
            return Ok(());
        };

        let key = file.key();
        let dir = self.layout.dir(&key);
        tokio::fs::create_dir_all(&dir).await?;

        let mut child = self
            .command(file, &dir)
            .spawn()
            .map_err(|e| StorageError::TransferProcess(format!("failed to spawn {}: {e}", self.program.display())))?;

        let started = self
            .registry
            .start(file.content_hash.clone(), move |_| async move {
                match child.wait().await {
                    Ok(status) if status.success() => {
                        tracing::info!(hash = %key.content_hash, name = %key.name, "aria2c finished");
                    }
                    Ok(status) => {
                        let e = StorageError::TransferProcess(format!("aria2c exited with {status}"));
                        tracing::warn!(hash = %key.content_hash, name = %key.name, error = %e, "transfer failed");
                    }
                    Err(e) => {
                        let e = StorageError::TransferProcess(e.to_string());
                        tracing::warn!(hash = %key.content_hash, name = %key.name, error = %e, "transfer failed");
                    }
                }
            })
            .await;

        if started {
            tracing::info!(hash = %file.content_hash, name = %file.name, "aria2c started");
        }
        Ok(())
    }

    async fn remove_file(&self, key: &FileKey) -> Result<()> {
        self.registry.cancel(&key.content_hash).await;

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
