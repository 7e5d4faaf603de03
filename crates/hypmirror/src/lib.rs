//! Keeps a local mirror of HYP launcher game packages in sync.
//!
//! Every tick each configured launcher is asked for its current catalogue;
//! the catalogue is flattened and reconciled per game, files that are no
//! longer wanted are evicted, missing ones are downloaded, and a status
//! snapshot describing every file is published.
//!
//! - [`source`] - launcher API client
//! - [`config`] - `app.config.json`
//! - [`orchestrator`] - the tick loop
//! - [`status`] - the published snapshot

pub mod config;
mod error;
pub mod orchestrator;
pub mod source;
pub mod status;

pub use config::AppConfig;
pub use error::{ConfigError, Error, Result, SourceError};
pub use orchestrator::{Orchestrator, Stream, Task};
pub use source::{CatalogueSource, HypClient, Launcher, LauncherOptions};
pub use status::{PublicFileInfo, PublicStatus, StatusPublisher, StreamStatus};
