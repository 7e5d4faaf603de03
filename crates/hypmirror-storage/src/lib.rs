//! Content-addressed storage backends for the mirror.
//!
//! Every backend stores one artifact per content hash and drives the same
//! per-file state machine:
//!
//! ```text
//! (absent) / ERROR ──download_remote_file──▶ DOWNLOADING ──▶ READY
//!                                                  └───────▶ ERROR
//! any ──remove_file──▶ (absent)
//! ```
//!
//! - [`Ephemeral`] - in-memory simulation, no I/O
//! - [`Durable`] - built-in HTTP downloader with a `.status` sidecar
//! - [`Aria2`] - one `aria2c` process per transfer
//!
//! Backends own their in-flight transfers through a [`TransferRegistry`];
//! removal cancels and awaits a transfer before deleting anything.

mod aria2;
mod backend;
mod config;
mod durable;
mod ephemeral;
mod error;
mod layout;
mod record;
mod registry;

pub use aria2::Aria2;
pub use backend::{FileStorage, StorageBackend};
pub use config::StorageConfig;
pub use durable::Durable;
pub use ephemeral::{Ephemeral, MAX_RANDOM_DELAY, SIMULATED_PROGRESS, SimulatedDelay};
pub use error::{Result, StorageError};
pub use layout::Layout;
pub use record::{FileStatus, StorageRecord};
pub use registry::{TransferProgress, TransferRegistry};
