//! Ownership of in-flight transfers.
//!
//! Each backend owns one registry. A transfer is a spawned task plus a cancel
//! signal; the task removes its own entry when it ends, but only if the entry
//! still carries its generation, so a superseding transfer is never dropped.
//!
//! Setting a transfer up (writing markers, probing the remote) happens under
//! an [`Admission`], so two callers never prepare the same hash at once.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use hypmirror_catalogue::ContentHash;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

/// Latest known completion fraction of a transfer, written from progress
/// callbacks.
#[derive(Debug, Clone, Default)]
pub struct TransferProgress(Arc<std::sync::Mutex<Option<f64>>>);

impl TransferProgress {
    pub fn set(&self, fraction: Option<f64>) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = fraction;
        }
    }

    pub fn get(&self) -> Option<f64> { self.0.lock().ok().and_then(|guard| *guard) }
}

struct TransferHandle {
    generation: u64,
    cancel:     oneshot::Sender<()>,
    task:       JoinHandle<()>,
    progress:   TransferProgress,
}

impl TransferHandle {
    fn is_live(&self) -> bool { !self.task.is_finished() }
}

#[derive(Default)]
struct Transfers {
    next_generation: u64,
    by_hash:         HashMap<ContentHash, TransferHandle>,
}

#[derive(Default)]
pub struct TransferRegistry {
    inner:     Mutex<Transfers>,
    admitting: std::sync::Mutex<HashSet<ContentHash>>,
}

/// Exclusive right to set up a transfer for one hash. Released on drop.
pub struct Admission {
    registry: Arc<TransferRegistry>,
    hash:     ContentHash,
}

impl Drop for Admission {
    fn drop(&mut self) {
        if let Ok(mut admitting) = self.registry.admitting.lock() {
            admitting.remove(&self.hash);
        }
    }
}

impl TransferRegistry {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Claim `hash` for setting up a transfer. `None` while a transfer for it
    /// is live or another caller holds the claim.
    pub async fn admit(self: &Arc<Self>, hash: &ContentHash) -> Option<Admission> {
        let transfers = self.inner.lock().await;
        if transfers.by_hash.get(hash).is_some_and(TransferHandle::is_live) {
            return None;
        }
        let mut admitting = self.admitting.lock().ok()?;
        if !admitting.insert(hash.clone()) {
            return None;
        }
        Some(Admission {
            registry: Arc::clone(self),
            hash:     hash.clone(),
        })
    }

    pub async fn is_live(&self, hash: &ContentHash) -> bool {
        self.inner.lock().await.by_hash.get(hash).is_some_and(TransferHandle::is_live)
    }

    /// Progress of the live transfer for `hash`, `None` when there is none.
    pub async fn progress(&self, hash: &ContentHash) -> Option<TransferProgress> {
        let transfers = self.inner.lock().await;
        transfers
            .by_hash
            .get(hash)
            .filter(|handle| handle.is_live())
            .map(|handle| handle.progress.clone())
    }

    /// Spawn `work` as the transfer for `hash`.
    ///
    /// Returns `false` without running `work` when a live transfer for the
    /// hash already exists. The future is dropped if the transfer is
    /// cancelled.
    pub async fn start<F, Fut>(self: &Arc<Self>, hash: ContentHash, work: F) -> bool
    where
        F: FnOnce(TransferProgress) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut transfers = self.inner.lock().await;
        if transfers.by_hash.get(&hash).is_some_and(TransferHandle::is_live) {
            return false;
        }

        transfers.next_generation += 1;
        let generation = transfers.next_generation;
        let progress = TransferProgress::default();
        let (cancel, cancelled) = oneshot::channel();
        let fut = work(progress.clone());

        let registry = Arc::clone(self);
        let key = hash.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                () = fut => {}
                _ = cancelled => {
                    tracing::debug!(hash = %key, "transfer cancelled");
                }
            }
            registry.finish(&key, generation).await;
        });

        transfers.by_hash.insert(hash, TransferHandle {
            generation,
            cancel,
            task,
            progress,
        });
        true
    }

    /// Cancel the transfer for `hash` and wait until it has stopped.
    /// Returns whether there was one.
    pub async fn cancel(&self, hash: &ContentHash) -> bool {
        let handle = self.inner.lock().await.by_hash.remove(hash);
        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.cancel.send(());
        if let Err(e) = handle.task.await
            && e.is_panic()
        {
            tracing::warn!(%hash, "transfer task panicked");
        }
        true
    }

    /// Number of registered transfers that are still running.
    pub async fn active_transfers(&self) -> usize {
        self.inner.lock().await.by_hash.values().filter(|h| h.is_live()).count()
    }

    async fn finish(&self, hash: &ContentHash, generation: u64) {
        let mut transfers = self.inner.lock().await;
        if transfers.by_hash.get(hash).is_some_and(|h| h.generation == generation) {
            transfers.by_hash.remove(hash);
        }
    }
}
