//! Effects layer: network and filesystem I/O.

mod fetcher;
mod http;

pub use fetcher::{Fetcher, staging_path};
pub use http::{BoxStream, HeadInfo, HttpClient, HttpResponse};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
