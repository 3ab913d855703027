//! Fetch strategies and the lightweight HTTP implementation
//!
//! This module defines the seam between the pipeline and the transport:
//! - The `FetchStrategy` trait both transports implement
//! - Building a per-batch HTTP client
//! - Concurrent GET requests with randomized headers
//! - Mapping transport failures onto fetch outcomes

use super::headers::random_headers;
use super::status::classify_response;
use super::BatchUrl;
use crate::config::HttpConfig;
use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Result of fetching one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Accepted response; the page body (or root element HTML in browser mode)
    Body(String),

    /// Rejected response status code
    Status(u16),

    /// No result: timeout or transport failure
    Skipped,
}

/// A transport that fetches whole batches concurrently
#[async_trait]
pub trait FetchStrategy: Send {
    /// Fetches every URL in the batch
    ///
    /// The returned outcomes line up one-to-one with `batch`. Per-URL
    /// failures become `FetchOutcome::Skipped`; `Err` is reserved for
    /// failures that make the whole session unusable.
    async fn fetch_batch(&mut self, batch: &[BatchUrl]) -> Result<Vec<FetchOutcome>>;

    /// Releases everything the strategy holds for the session
    async fn close(self: Box<Self>) -> Result<()>;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}

/// Plain concurrent HTTP GETs
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FetchStrategy for HttpFetcher {
    async fn fetch_batch(&mut self, batch: &[BatchUrl]) -> Result<Vec<FetchOutcome>> {
        // One connection pool per batch, dropped once the batch is in
        let client = build_http_client(&self.config)?;
        let outcomes = join_all(batch.iter().map(|target| fetch_url(&client, target))).await;
        Ok(outcomes)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Builds an HTTP client with the configured timeouts
///
/// # Arguments
///
/// * `config` - The HTTP strategy configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```
/// use sift_scrape::config::HttpConfig;
/// use sift_scrape::pipeline::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a single URL with randomized headers
///
/// # Outcome mapping
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | HTTP 200 | `Body(text)` |
/// | Any other status | `Status(code)` |
/// | Timeout | `Skipped` (debug) |
/// | Other transport error | `Skipped` (warning) |
pub async fn fetch_url(client: &Client, target: &BatchUrl) -> FetchOutcome {
    let url = target.as_str();

    let response = match client
        .get(target.url.clone())
        .headers(header_map(&random_headers()))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return transport_failure(url, &e),
    };

    let status = response.status().as_u16();
    if !classify_response(url, status).is_accept() {
        return FetchOutcome::Status(status);
    }

    match response.text().await {
        Ok(body) => {
            tracing::trace!(url, bytes = body.len(), "Fetched page");
            FetchOutcome::Body(body)
        }
        Err(e) => transport_failure(url, &e),
    }
}

fn transport_failure(url: &str, error: &reqwest::Error) -> FetchOutcome {
    if error.is_timeout() {
        tracing::debug!(url, "Request timed out");
    } else {
        tracing::warn!(url, error = %error, "Request failed");
    }
    FetchOutcome::Skipped
}

fn header_map(headers: &[(&'static str, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if let Ok(value) = HeaderValue::from_str(value) {
            map.insert(HeaderName::from_static(name), value);
        }
    }
    map
}
