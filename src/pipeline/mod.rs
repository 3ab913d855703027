//! Batch scraping pipeline
//!
//! This module contains the core session logic, including:
//! - Fair batch scheduling across sites
//! - Concurrent fetching over plain HTTP or a headless browser
//! - Response status classification
//! - Bounded parallel extraction
//! - Result aggregation and inter-batch pacing

mod browser;
mod coordinator;
mod fetcher;
mod headers;
mod scheduler;
mod status;
mod worker;

pub use browser::BrowserFetcher;
pub use coordinator::{run_session, Coordinator, SessionReport};
pub use fetcher::{build_http_client, fetch_url, FetchOutcome, FetchStrategy, HttpFetcher};
pub use headers::{random_headers, USER_AGENTS};
pub use scheduler::{partition, reorder, reorder_by, BatchScheduler};
pub use status::{classify, classify_response, Classification};
pub use worker::{scrape_page, ExtractionPool, WorkResult};

use crate::url::{parse_target, site_name};
use crate::{UrlError, UrlResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

/// A target URL paired with the site identifier it groups under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUrl {
    pub url: Url,
    pub site: String,
}

impl BatchUrl {
    /// Parses a raw target URL and resolves its site identifier
    pub fn parse(raw: &str) -> UrlResult<Self> {
        let url = parse_target(raw)?;
        let site = site_name(&url).ok_or_else(|| UrlError::MissingHost(raw.to_string()))?;
        Ok(Self { url, site })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// What a single URL contributed to the session results
///
/// Serializes untagged: an extracted page is a JSON object, a rejected
/// response is its bare status code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageOutcome {
    Extracted(Map<String, Value>),
    Status(u16),
}

/// Per-site accumulator of page outcomes, in batch order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SessionResults {
    sites: BTreeMap<String, Vec<PageOutcome>>,
}

impl SessionResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome to the site's bucket
    pub fn push(&mut self, site: &str, outcome: PageOutcome) {
        self.sites.entry(site.to_string()).or_default().push(outcome);
    }

    pub fn get(&self, site: &str) -> Option<&[PageOutcome]> {
        self.sites.get(site).map(Vec::as_slice)
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// Total number of outcomes across all sites
    pub fn len(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Runs `f` under a scoped subscriber and returns what it logged
#[cfg(test)]
pub(crate) fn capture_logs<F: FnOnce()>(f: F) -> String {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let buffer = Capture(Arc::new(Mutex::new(Vec::new())));
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
