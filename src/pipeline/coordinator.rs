//! Session coordinator - main batch orchestration logic
//!
//! This module contains the batch loop that coordinates a scraping
//! session, including:
//! - Building the schedule and the fetch strategy
//! - Fetching each batch and handing it to the extraction pool
//! - Aggregating results per site
//! - Pacing between batches
//! - Returning partial results when a batch fails

use super::browser::BrowserFetcher;
use super::fetcher::{FetchStrategy, HttpFetcher};
use super::scheduler::BatchScheduler;
use super::worker::{ExtractionPool, WorkResult};
use super::{BatchUrl, PageOutcome, SessionResults};
use crate::config::{validate, BatchConfig, FetchMode, SessionConfig};
use crate::output::SessionStats;
use crate::schema::SchemaStore;
use crate::state::SessionState;
use crate::{Result, SiftError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a finished session produced
#[derive(Debug)]
pub struct SessionReport {
    /// Per-site results, complete or partial
    pub results: SessionResults,

    /// Session counters
    pub stats: SessionStats,

    /// `Done`, or `Aborted` when a batch failed
    pub final_state: SessionState,

    /// The failure that aborted the session, if any
    pub error: Option<String>,
}

impl SessionReport {
    pub fn is_complete(&self) -> bool {
        self.final_state == SessionState::Done
    }
}

/// Main session coordinator structure
pub struct Coordinator {
    scheduler: BatchScheduler,
    fetcher: Box<dyn FetchStrategy>,
    pool: ExtractionPool,
    batch_delay: Duration,
    state: SessionState,
    results: SessionResults,
    stats: SessionStats,
}

impl Coordinator {
    /// Creates a coordinator using the fetch strategy the config selects
    ///
    /// # Arguments
    ///
    /// * `urls` - Raw target URLs
    /// * `schemas` - The loaded schema store
    /// * `config` - The session configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SiftError)` - Invalid configuration or an unparsable URL
    pub fn new(urls: &[String], schemas: SchemaStore, config: &SessionConfig) -> Result<Self> {
        validate(config)?;
        let schemas = Arc::new(schemas);

        let fetcher: Box<dyn FetchStrategy> = match config.session.mode {
            FetchMode::Http => Box::new(HttpFetcher::new(config.http.clone())),
            FetchMode::Browser => Box::new(BrowserFetcher::new(
                config.browser.clone(),
                Arc::clone(&schemas),
            )),
        };

        Self::with_fetcher(urls, schemas, &config.session, fetcher)
    }

    /// Creates a coordinator around an explicit fetch strategy
    pub fn with_fetcher(
        urls: &[String],
        schemas: Arc<SchemaStore>,
        config: &BatchConfig,
        fetcher: Box<dyn FetchStrategy>,
    ) -> Result<Self> {
        let targets = urls
            .iter()
            .map(|raw| BatchUrl::parse(raw))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        warn_unknown_sites(&targets, &schemas);

        let scheduler = BatchScheduler::new(targets, config)?;
        let pool = ExtractionPool::new(schemas, config.worker_count());
        let stats = SessionStats::new(scheduler.total_batches());

        Ok(Self {
            scheduler,
            fetcher,
            pool,
            batch_delay: config.batch_delay(),
            state: SessionState::Ready,
            results: SessionResults::new(),
            stats,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs every batch and returns the session report
    ///
    /// A failure escaping a batch stops the remaining batches; whatever was
    /// aggregated before it is still returned. The fetch strategy is
    /// closed on every path.
    pub async fn run(mut self) -> SessionReport {
        let start_time = Instant::now();
        tracing::info!(
            urls = self.scheduler.url_count(),
            batches = self.scheduler.total_batches(),
            mode = self.fetcher.name(),
            workers = self.pool.workers(),
            "Starting scraping session"
        );

        let error = match self.run_batches().await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    batch = self.scheduler.batch_number(),
                    error = %e,
                    "Session aborted"
                );
                self.state = self
                    .state
                    .transition(SessionState::Aborted)
                    .unwrap_or(SessionState::Aborted);
                Some(e.to_string())
            }
        };

        let Self {
            fetcher,
            results,
            mut stats,
            state,
            ..
        } = self;

        if let Err(e) = fetcher.close().await {
            tracing::warn!(error = %e, "Failed to close fetch strategy");
        }

        stats.elapsed = start_time.elapsed();
        tracing::info!(
            batches = stats.batches,
            urls = stats.urls_fetched,
            extracted = stats.extracted,
            rejected = stats.rejected,
            skipped = stats.skipped,
            "Session finished in {:?}",
            stats.elapsed
        );

        SessionReport {
            results,
            stats,
            final_state: state,
            error,
        }
    }

    async fn run_batches(&mut self) -> Result<()> {
        while let Some(batch) = self.scheduler.next_batch() {
            let number = self.scheduler.batch_number();
            self.process_batch(number, batch).await?;
            self.stats.batches += 1;

            if self.scheduler.is_empty() {
                break;
            }

            self.advance(SessionState::Delaying(number))?;
            tracing::debug!(
                batch = number,
                remaining = self.scheduler.remaining(),
                "Waiting {:?} before next batch",
                self.batch_delay
            );
            tokio::time::sleep(self.batch_delay).await;
        }

        self.advance(SessionState::Done)
    }

    /// Fetches one batch, extracts it, and folds the results in
    async fn process_batch(&mut self, number: usize, batch: Vec<BatchUrl>) -> Result<()> {
        self.advance(SessionState::Fetching(number))?;
        tracing::info!(
            batch = number,
            total = self.scheduler.total_batches(),
            urls = batch.len(),
            "Fetching batch"
        );

        let fetched = self.fetcher.fetch_batch(&batch).await?;
        if fetched.len() != batch.len() {
            return Err(SiftError::Worker(format!(
                "fetch strategy returned {} outcomes for {} URLs",
                fetched.len(),
                batch.len()
            )));
        }
        self.stats.record_fetches(&fetched);

        self.advance(SessionState::Extracting(number))?;
        let results = self
            .pool
            .run_batch(batch.into_iter().zip(fetched).collect())
            .await?;
        self.aggregate(results);

        Ok(())
    }

    /// Appends each outcome to its own site's bucket
    fn aggregate(&mut self, results: Vec<WorkResult>) {
        for WorkResult { target, outcome } in results {
            match outcome {
                Ok(Some(page)) => {
                    if matches!(page, PageOutcome::Extracted(_)) {
                        self.stats.extracted += 1;
                    }
                    self.results.push(&target.site, page);
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.extraction_failures += 1;
                    tracing::error!(
                        url = target.as_str(),
                        site = %target.site,
                        error = %e,
                        "Extraction failed"
                    );
                }
            }
        }
    }

    fn advance(&mut self, next: SessionState) -> Result<()> {
        self.state = self.state.transition(next)?;
        tracing::trace!(state = %self.state, "Session state changed");
        Ok(())
    }
}

/// Warns once per site that has URLs but no schema
fn warn_unknown_sites(targets: &[BatchUrl], schemas: &SchemaStore) {
    let unknown: BTreeSet<&str> = targets
        .iter()
        .map(|t| t.site.as_str())
        .filter(|site| !schemas.contains(site))
        .collect();

    for site in unknown {
        tracing::warn!(site, "No scraping schema for site; its pages will be dropped");
    }
}

/// Runs a complete scraping session
///
/// This is the main entry point for scraping. It will:
/// 1. Parse every URL and resolve its site
/// 2. Interleave and batch the URLs
/// 3. Fetch, extract and aggregate each batch in order
/// 4. Pause between batches
///
/// # Arguments
///
/// * `urls` - Raw target URLs
/// * `schemas` - The loaded schema store
/// * `config` - The session configuration
///
/// # Returns
///
/// * `Ok(SessionResults)` - Per-site results; partial if a batch failed
/// * `Err(SiftError)` - The session could not be set up
pub async fn run_session(
    urls: &[String],
    schemas: SchemaStore,
    config: &SessionConfig,
) -> Result<SessionResults> {
    let coordinator = Coordinator::new(urls, schemas, config)?;
    Ok(coordinator.run().await.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FetchOutcome;
    use crate::schema::parse_schema;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves canned outcomes keyed by URL path and records each batch
    struct StubFetcher {
        batches: Arc<Mutex<Vec<Vec<String>>>>,
        fail_on_batch: Option<usize>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                batches: Arc::new(Mutex::new(Vec::new())),
                fail_on_batch: None,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    #[async_trait]
    impl FetchStrategy for StubFetcher {
        async fn fetch_batch(&mut self, batch: &[BatchUrl]) -> Result<Vec<FetchOutcome>> {
            let mut batches = self.batches.lock().unwrap();
            batches.push(batch.iter().map(|u| u.as_str().to_string()).collect());
            if Some(batches.len()) == self.fail_on_batch {
                return Err(SiftError::Browser("browser crashed".to_string()));
            }

            Ok(batch
                .iter()
                .map(|target| match target.url.path() {
                    "/missing" => FetchOutcome::Status(404),
                    "/slow" => FetchOutcome::Skipped,
                    path => FetchOutcome::Body(format!("<h1>{}{}</h1>", target.site, path)),
                })
                .collect())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn create_test_store() -> Arc<SchemaStore> {
        let title = r#"{ "type": "html", "data": { "title": { "item-data": [ { "tag": "h1", "attr": ".text" } ] } } }"#;
        Arc::new(parse_schema(&format!(r#"{{ "a": {title}, "b": {title} }}"#)).unwrap())
    }

    fn create_test_config(batch_size: usize) -> BatchConfig {
        BatchConfig {
            batch_size,
            batch_delay_secs: 0,
            extraction_workers: 2,
            ..BatchConfig::default()
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_session_appends_across_batches() {
        let stub = StubFetcher::new();
        let batches = Arc::clone(&stub.batches);
        let closed = Arc::clone(&stub.closed);

        let coordinator = Coordinator::with_fetcher(
            &urls(&["https://a.com/1", "https://a.com/2", "https://b.com/1", "https://b.com/2"]),
            create_test_store(),
            &create_test_config(2),
            Box::new(stub),
        )
        .unwrap();
        assert_eq!(coordinator.state(), SessionState::Ready);

        let report = coordinator.run().await;
        assert!(report.is_complete());
        assert!(report.error.is_none());
        assert!(*closed.lock().unwrap());

        assert_eq!(
            *batches.lock().unwrap(),
            vec![
                vec!["https://a.com/1", "https://b.com/1"],
                vec!["https://a.com/2", "https://b.com/2"],
            ]
        );

        let value = serde_json::to_value(&report.results).unwrap();
        assert_eq!(
            value,
            json!({
                "a": [ { "title": "a/1" }, { "title": "a/2" } ],
                "b": [ { "title": "b/1" }, { "title": "b/2" } ]
            })
        );
        assert_eq!(report.stats.batches, 2);
        assert_eq!(report.stats.extracted, 4);
    }

    #[tokio::test]
    async fn test_rejections_and_skips() {
        let report = Coordinator::with_fetcher(
            &urls(&["https://a.com/missing", "https://a.com/slow", "https://a.com/ok"]),
            create_test_store(),
            &create_test_config(3),
            Box::new(StubFetcher::new()),
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(
            report.results.get("a"),
            Some(
                &[
                    PageOutcome::Status(404),
                    PageOutcome::Extracted(
                        json!({ "title": "a/ok" }).as_object().unwrap().clone()
                    ),
                ][..]
            )
        );
        assert_eq!(report.stats.rejected, 1);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.accepted, 1);
    }

    #[tokio::test]
    async fn test_unknown_site_is_dropped() {
        let report = Coordinator::with_fetcher(
            &urls(&["https://a.com/1", "https://zzz.net/1"]),
            create_test_store(),
            &create_test_config(5),
            Box::new(StubFetcher::new()),
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(report.results.sites().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(report.stats.extraction_failures, 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_failure_returns_partial_results() {
        let mut stub = StubFetcher::new();
        stub.fail_on_batch = Some(2);
        let closed = Arc::clone(&stub.closed);

        let report = Coordinator::with_fetcher(
            &urls(&["https://a.com/1", "https://a.com/2", "https://a.com/3"]),
            create_test_store(),
            &create_test_config(1),
            Box::new(stub),
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(report.final_state, SessionState::Aborted);
        assert!(report.error.unwrap().contains("browser crashed"));
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.stats.batches, 1);
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_empty_url_list_finishes() {
        let report = Coordinator::with_fetcher(
            &[],
            create_test_store(),
            &create_test_config(2),
            Box::new(StubFetcher::new()),
        )
        .unwrap()
        .run()
        .await;

        assert!(report.is_complete());
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_setup_errors() {
        let bad_url = Coordinator::with_fetcher(
            &urls(&["not a url"]),
            create_test_store(),
            &create_test_config(2),
            Box::new(StubFetcher::new()),
        );
        assert!(matches!(bad_url, Err(SiftError::UrlError(_))));

        let zero_batch = Coordinator::with_fetcher(
            &urls(&["https://a.com/1"]),
            create_test_store(),
            &create_test_config(0),
            Box::new(StubFetcher::new()),
        );
        assert!(matches!(zero_batch, Err(SiftError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_batches() {
        let config = BatchConfig {
            batch_delay_secs: 10,
            ..create_test_config(1)
        };
        let started = tokio::time::Instant::now();

        let report = Coordinator::with_fetcher(
            &urls(&["https://a.com/1", "https://b.com/1"]),
            create_test_store(),
            &config,
            Box::new(StubFetcher::new()),
        )
        .unwrap()
        .run()
        .await;

        assert!(report.is_complete());
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(10));
        assert!(waited < Duration::from_secs(20));
    }
}
