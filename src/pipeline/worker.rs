//! Bounded extraction worker pool
//!
//! HTML parsing and field extraction are CPU bound, so they run on tokio's
//! blocking pool. A semaphore caps how many run at once; workers share the
//! schema store read-only.

use super::fetcher::FetchOutcome;
use super::{BatchUrl, PageOutcome};
use crate::extract::{extract_page, ExtractError};
use crate::schema::SchemaStore;
use crate::{Result, SiftError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One URL's extraction result, carrying the URL it belongs to
#[derive(Debug)]
pub struct WorkResult {
    pub target: BatchUrl,

    /// `Ok(None)` when the fetch produced nothing to record
    pub outcome: std::result::Result<Option<PageOutcome>, ExtractError>,
}

/// Runs extraction jobs on the blocking pool, at most `workers` at a time
#[derive(Debug, Clone)]
pub struct ExtractionPool {
    schemas: Arc<SchemaStore>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ExtractionPool {
    pub fn new(schemas: Arc<SchemaStore>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            schemas,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extracts every fetched page of a batch
    ///
    /// Results come back in input order, each tagged with its URL.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<WorkResult>)` - One result per input
    /// * `Err(SiftError::Worker)` - A worker panicked or the pool shut down
    pub async fn run_batch(&self, items: Vec<(BatchUrl, FetchOutcome)>) -> Result<Vec<WorkResult>> {
        let total = items.len();
        let mut tasks = JoinSet::new();

        for (index, (target, fetched)) in items.into_iter().enumerate() {
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| SiftError::Worker(e.to_string()))?;
            let schemas = Arc::clone(&self.schemas);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let outcome = scrape_page(&schemas, &target, fetched);
                (index, WorkResult { target, outcome })
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.map_err(|e| SiftError::Worker(e.to_string()))?);
        }
        results.sort_by_key(|(index, _)| *index);

        Ok(results.into_iter().map(|(_, result)| result).collect())
    }
}

/// Turns one fetch outcome into a page outcome
///
/// # Returns
///
/// * `Ok(Some(PageOutcome::Status))` - The response was rejected
/// * `Ok(Some(PageOutcome::Extracted))` - The body was extracted
/// * `Ok(None)` - The fetch was skipped
/// * `Err(ExtractError)` - No schema for the site, or an unsupported response type
pub fn scrape_page(
    schemas: &SchemaStore,
    target: &BatchUrl,
    fetched: FetchOutcome,
) -> std::result::Result<Option<PageOutcome>, ExtractError> {
    match fetched {
        FetchOutcome::Skipped => Ok(None),
        FetchOutcome::Status(code) => Ok(Some(PageOutcome::Status(code))),
        FetchOutcome::Body(body) => {
            let schema = schemas
                .get(&target.site)
                .ok_or_else(|| ExtractError::UnknownSite(target.site.clone()))?;
            let fields = extract_page(&target.site, &body, schema)?;
            Ok(Some(PageOutcome::Extracted(fields)))
        }
    }
}
