use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Response to a body request.
pub struct HttpResponse<E> {
    /// Status code; `206` signals that a range request was honoured.
    pub status: u16,

    /// `Content-Length` of this response, which for a `206` is the length of
    /// the remaining range rather than the whole file.
    pub content_length: Option<u64>,

    pub body: BoxStream<'static, Result<Bytes, E>>,
}

/// Response head of a `HEAD` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    pub status: u16,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
    /// URL after redirects, when the client follows them.
    pub final_url: Option<String>,
}

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the minimal interface needed for mirroring. Implementations
/// handle their own redirect following and timeout configuration.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a `GET` with the given extra headers and return the streaming body.
    ///
    /// Non-success statuses are returned as a response, not as an error, so the
    /// caller can tell a refused range (`200`) from a honoured one (`206`).
    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse<Self::Error>, Self::Error>> + Send;

    /// Send a `HEAD` and return the headers relevant to validation.
    fn head(&self, url: &str) -> impl Future<Output = Result<HeadInfo, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use futures_util::StreamExt;

    /// Production HTTP client implementation using reqwest.
    #[derive(Clone, Default)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Self { Self::default() }

        pub fn with_client(client: reqwest::Client) -> Self { Self { client } }

        pub fn inner(&self) -> &reqwest::Client { &self.client }
    }

    fn header_u64(headers: &reqwest::header::HeaderMap, name: reqwest::header::HeaderName) -> Option<u64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn stream(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<HttpResponse<Self::Error>, Self::Error> {
            let mut request = self.client.get(url);

            for (key, value) in headers {
                request = request.header(key, value);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let content_length = header_u64(response.headers(), reqwest::header::CONTENT_LENGTH);
            let body = response.bytes_stream().map(|chunk| chunk.map(Bytes::from));

            Ok(HttpResponse {
                status,
                content_length,
                body: Box::pin(body),
            })
        }

        async fn head(&self, url: &str) -> Result<HeadInfo, Self::Error> {
            let response = self.client.head(url).send().await?;
            let headers = response.headers();

            Ok(HeadInfo {
                status: response.status().as_u16(),
                content_length: header_u64(headers, reqwest::header::CONTENT_LENGTH),
                content_disposition: headers
                    .get(reqwest::header::CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                final_url: Some(response.url().to_string()),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
