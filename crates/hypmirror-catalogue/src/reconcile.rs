//! Per-stream reconciliation state.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::descriptor::{ContentHash, FileDescriptor, FileKey};
use crate::error::Result;
use crate::flatten::flatten;
use crate::hyp::GamePackage;
use crate::policy::SelectionPolicy;

/// Hash-keyed summary of one changing update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added:    usize,
    pub removed:  usize,
    /// Same content hash, different metadata.
    pub retagged: usize,
}

impl ChangeSummary {
    fn between(old: &[FileDescriptor], new: &[FileDescriptor]) -> Self {
        let old: HashMap<&ContentHash, &FileDescriptor> = old.iter().map(|f| (&f.content_hash, f)).collect();
        let new: HashMap<&ContentHash, &FileDescriptor> = new.iter().map(|f| (&f.content_hash, f)).collect();

        let mut summary = Self::default();
        for (hash, descriptor) in &new {
            match old.get(hash) {
                None => summary.added += 1,
                Some(previous) if previous != descriptor => summary.retagged += 1,
                Some(_) => {}
            }
        }
        summary.removed = old.keys().filter(|hash| !new.contains_key(*hash)).count();
        summary
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} -{} ~{}", self.added, self.removed, self.retagged)
    }
}

/// Tracks what one content stream wants now and what it stopped wanting.
///
/// [`Reconciler::update`] is the only mutator. `deprecated` holds the keys
/// evicted by the most recent call and is cleared by a call that changes
/// nothing, so an eviction is never handed out twice.
///
/// Eviction is keyed by content hash: a file that keeps its hash under a new
/// name is not deprecated, so nothing asks storage to delete the copy kept
/// under the old name. It stays next to the new one until the hash itself is
/// evicted.
#[derive(Debug, Clone)]
pub struct Reconciler {
    policy:          SelectionPolicy,
    current:         Vec<FileDescriptor>,
    deprecated:      Vec<FileKey>,
    last_changed_at: Option<DateTime<Utc>>,
    last_summary:    Option<ChangeSummary>,
}

impl Reconciler {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            current: Vec::new(),
            deprecated: Vec::new(),
            last_changed_at: None,
            last_summary: None,
        }
    }

    pub fn policy(&self) -> &SelectionPolicy { &self.policy }

    pub fn current(&self) -> &[FileDescriptor] { &self.current }

    pub fn deprecated(&self) -> &[FileKey] { &self.deprecated }

    pub fn last_changed_at(&self) -> Option<DateTime<Utc>> { self.last_changed_at }

    pub fn last_summary(&self) -> Option<ChangeSummary> { self.last_summary }

    /// Flatten `package` and fold it into the state. Returns whether the
    /// current set changed. A malformed payload leaves the state untouched.
    pub fn update(&mut self, package: &GamePackage) -> Result<bool> { self.update_at(package, Utc::now()) }

    /// [`Reconciler::update`] with an explicit timestamp.
    pub fn update_at(&mut self, package: &GamePackage, now: DateTime<Utc>) -> Result<bool> {
        let files = flatten(package, &self.policy)?;
        let changed = self.apply_at(files, now);
        if changed {
            let summary = self.last_summary.unwrap_or_default();
            tracing::info!(
                game = %package.game.biz,
                files = self.current.len(),
                deprecated = self.deprecated.len(),
                %summary,
                "catalogue changed"
            );
        }
        Ok(changed)
    }

    /// Fold an already flattened sequence into the state.
    pub fn apply(&mut self, files: Vec<FileDescriptor>) -> bool { self.apply_at(files, Utc::now()) }

    fn apply_at(&mut self, files: Vec<FileDescriptor>, now: DateTime<Utc>) -> bool {
        if files == self.current {
            self.deprecated.clear();
            return false;
        }

        // Anything whose hash is still wanted keeps its content, even if the
        // descriptor around it changed.
        let wanted: HashSet<&ContentHash> = files.iter().map(|f| &f.content_hash).collect();
        self.deprecated = self
            .current
            .iter()
            .filter(|old| !files.contains(old) && !wanted.contains(&old.content_hash))
            .map(FileKey::from)
            .collect();

        self.last_summary = Some(ChangeSummary::between(&self.current, &files));
        self.current = files;
        self.last_changed_at = Some(now);
        true
    }
}
