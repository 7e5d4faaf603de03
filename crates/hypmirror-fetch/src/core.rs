//! Core layer: pure transformations with no I/O.

mod headers;
mod retry;

pub use headers::{content_disposition_file_name, range_header, url_file_name};
pub use retry::retry_delay;
