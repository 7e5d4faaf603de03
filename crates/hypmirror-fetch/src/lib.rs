//! HTTP transfers with streaming verification and atomic placement.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and types
//! - [`core`] - Pure transformations
//! - [`effects`] - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Single-Pass**: bytes are hashed while they are written to the staging file
//! - **Resumable**: an existing `<destination>.part` is continued with a range
//!   request and the whole file is re-verified
//! - **Atomic Placement**: the destination only ever appears fully verified
//! - **Mechanism-Only**: no retry or scheduling policy; callers decide

pub mod core;
pub mod data;
mod effects;
mod error;

pub use core::{content_disposition_file_name, range_header, retry_delay, url_file_name};
pub use data::{FetchOptions, FetchPhase, Progress, RemoteMeta};
pub use effects::{BoxStream, Fetcher, HeadInfo, HttpClient, HttpResponse, staging_path};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{Error, Result};
