//! Data layer: immutable types for transfer configuration and progress tracking.

mod options;
mod progress;

pub use options::{FetchOptions, FetchPhase, ProgressCallback};
pub use progress::{Progress, RemoteMeta};
