//! Provider catalogue flattening and reconciliation.
//!
//! The launcher API describes content as branches of package groups of files,
//! partitioned by locale for voice-over assets. This crate is the only place
//! that understands that shape:
//!
//! - [`hyp`] - serde mirror of the provider's `GamePackage` payload
//! - [`policy`] - which branches, package kinds and locales a stream wants
//! - [`flatten`] - provider shape to an ordered, hash-unique [`FileDescriptor`] list
//! - [`reconcile`] - per-stream state tracking what is wanted now and what to evict

pub mod descriptor;
mod error;
pub mod flatten;
pub mod hyp;
pub mod policy;
pub mod reconcile;

pub use descriptor::{ContentHash, FileDescriptor, FileKey};
pub use error::{CatalogueError, Result};
pub use flatten::flatten;
pub use policy::{BranchPolicy, PatchSelection, SelectionPolicy};
pub use reconcile::{ChangeSummary, Reconciler};
