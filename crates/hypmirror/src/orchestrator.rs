//! Periodic reconciliation of every configured stream against storage.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::future::join_all;
use hypmirror_catalogue::{ContentHash, FileDescriptor, FileKey, Reconciler};
use hypmirror_storage::{FileStatus, FileStorage, StorageRecord};
use tokio::time::MissedTickBehavior;

use crate::config::TaskConfig;
use crate::error::Result;
use crate::source::CatalogueSource;
use crate::status::{PublicFileInfo, PublicStatus, StatusPublisher, StreamStatus};

/// One game of one launcher, with its own reconciliation state.
#[derive(Debug)]
pub struct Stream {
    pub game_id:    String,
    pub game_biz:   String,
    pub game_name:  String,
    pub reconciler: Reconciler,
}

/// A launcher and the streams selected from it.
pub struct Task<S> {
    source:  S,
    streams: Vec<Stream>,
}

impl<S: CatalogueSource> Task<S> {
    pub fn new(source: S, streams: Vec<Stream>) -> Self { Self { source, streams } }

    /// List the launcher's games and open a stream for every game a filter
    /// matches.
    pub async fn resolve(source: S, config: &TaskConfig) -> Result<Self> {
        let games = source.games().await?;
        let mut streams = Vec::new();
        for game in games {
            let Some(filter) = config.filter_for(&game.biz) else {
                tracing::debug!(biz = %game.biz, "no filter matches, skipping game");
                continue;
            };
            tracing::info!(launcher = source.launcher_id(), biz = %game.biz, name = %game.display.name, "stream selected");
            streams.push(Stream {
                game_id:    game.id,
                game_biz:   game.biz,
                game_name:  game.display.name,
                reconciler: Reconciler::new(filter.policy.clone()),
            });
        }
        Ok(Self::new(source, streams))
    }

    pub fn source(&self) -> &S { &self.source }

    pub fn streams(&self) -> &[Stream] { &self.streams }

    /// Fetch the catalogue and reconcile every stream. Returns the keys this
    /// refresh evicted.
    ///
    /// When the catalogue cannot be fetched, or a stream's payload is missing
    /// or malformed, that stream keeps its previous file set for this tick.
    async fn refresh(&mut self) -> Vec<FileKey> {
        let launcher_id = self.source.launcher_id();
        tracing::info!(launcher = %launcher_id, "refreshing launcher");

        let game_ids: Vec<String> = self.streams.iter().map(|s| s.game_id.clone()).collect();
        let packages = match self.source.game_packages(&game_ids).await {
            Ok(packages) => packages,
            Err(e) => {
                tracing::error!(launcher = %launcher_id, error = %e, "failed to fetch catalogue");
                return Vec::new();
            }
        };

        let mut deprecated = Vec::new();
        for stream in &mut self.streams {
            let Some(package) = packages.iter().find(|p| p.game.id == stream.game_id) else {
                tracing::warn!(stream = %stream.game_biz, game = %stream.game_id, "launcher did not return this game");
                continue;
            };
            match stream.reconciler.update(package) {
                Ok(true) => deprecated.extend_from_slice(stream.reconciler.deprecated()),
                Ok(false) => {}
                Err(e) => tracing::warn!(stream = %stream.game_biz, error = %e, "malformed catalogue, keeping previous files"),
            }
        }
        deprecated
    }

    /// Content hashes any stream of this task currently wants.
    fn wanted(&self) -> impl Iterator<Item = &ContentHash> {
        self.streams
            .iter()
            .flat_map(|stream| stream.reconciler.current())
            .map(|file| &file.content_hash)
    }

    /// Report every current file of every stream, starting downloads as
    /// needed.
    async fn sync<B: FileStorage>(&self, storage: &B) -> Vec<StreamStatus> {
        let launcher_id = self.source.launcher_id();
        join_all(self.streams.iter().map(|stream| async move {
            let files = join_all(stream.reconciler.current().iter().map(|file| sync_file(storage, file))).await;
            StreamStatus {
                stream_id: stream.game_biz.clone(),
                launcher_id: launcher_id.to_string(),
                game_id: stream.game_id.clone(),
                game_biz: stream.game_biz.clone(),
                game_name: stream.game_name.clone(),
                updated_at: stream.reconciler.last_changed_at().map(|t| t.timestamp_millis()),
                files,
            }
        }))
        .await
    }
}

async fn remove<B: FileStorage>(storage: &B, key: &FileKey) {
    tracing::info!(hash = %key.content_hash, name = %key.name, "removing deprecated file");
    if let Err(e) = storage.remove_file(key).await {
        tracing::warn!(hash = %key.content_hash, name = %key.name, error = %e, "failed to remove deprecated file");
    }
}

/// Report what storage holds for `file`, starting a download when it holds
/// nothing usable.
async fn sync_file<B: FileStorage>(storage: &B, file: &FileDescriptor) -> PublicFileInfo {
    let key = file.key();
    match storage.file_info(&key).await {
        Ok(record) if record.status != FileStatus::Error => return PublicFileInfo::new(file, record),
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            tracing::debug!(hash = %key.content_hash, name = %key.name, "not stored yet");
        }
        Err(e) => {
            tracing::warn!(hash = %key.content_hash, name = %key.name, error = %e, "failed to query storage");
        }
    }

    tracing::info!(hash = %key.content_hash, name = %key.name, "downloading");
    let record = match storage.download_remote_file(file).await {
        Ok(()) => StorageRecord {
            status: FileStatus::Downloading,
            ..StorageRecord::default()
        },
        Err(e) => {
            tracing::warn!(hash = %key.content_hash, name = %key.name, error = %e, "failed to start download");
            StorageRecord::error()
        }
    };
    PublicFileInfo::new(file, record)
}

/// Drives every task against one storage backend and publishes the result.
pub struct Orchestrator<S, B> {
    tasks:     Vec<Task<S>>,
    storage:   B,
    publisher: StatusPublisher,
}

impl<S: CatalogueSource, B: FileStorage> Orchestrator<S, B> {
    pub fn new(tasks: Vec<Task<S>>, storage: B, publisher: StatusPublisher) -> Self {
        Self {
            tasks,
            storage,
            publisher,
        }
    }

    pub fn tasks(&self) -> &[Task<S>] { &self.tasks }

    pub fn storage(&self) -> &B { &self.storage }

    pub fn last_status(&self) -> Option<&PublicStatus> { self.publisher.last() }

    /// Run one reconciliation pass over all tasks. Returns whether a new
    /// snapshot was published.
    ///
    /// Streams share the backend, so an evicted key is only removed when no
    /// stream of any task still wants its content hash.
    pub async fn tick(&mut self) -> Result<bool> {
        let evicted = join_all(self.tasks.iter_mut().map(|task| task.refresh())).await;

        let wanted: HashSet<&ContentHash> = self.tasks.iter().flat_map(|task| task.wanted()).collect();
        let mut seen = HashSet::new();
        let to_remove: Vec<FileKey> = evicted
            .into_iter()
            .flatten()
            .filter(|key| {
                if wanted.contains(&key.content_hash) {
                    tracing::debug!(hash = %key.content_hash, name = %key.name, "still wanted by another stream, keeping");
                    return false;
                }
                seen.insert(key.clone())
            })
            .collect();

        let storage = &self.storage;
        let removals = join_all(to_remove.iter().map(|key| remove(storage, key)));
        let syncs = join_all(self.tasks.iter().map(|task| task.sync(storage)));
        let (_, statuses) = tokio::join!(removals, syncs);

        let status = PublicStatus {
            streams: statuses.into_iter().flatten().collect(),
        };
        self.publisher.publish(status)
    }

    /// Tick every `interval`, starting immediately. A tick that overruns the
    /// interval delays the next one instead of overlapping it.
    pub async fn run(&mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "sync failed");
            }
        }
    }
}
