//! Headless browser fetch strategy over CDP
//!
//! One Chromium process and one incognito browsing context serve the whole
//! session. Every URL gets a fresh page that blocks heavy subresources,
//! carries randomized headers, and is closed as soon as its HTML is read.

use super::fetcher::{FetchOutcome, FetchStrategy};
use super::headers::random_headers;
use super::status::classify_response;
use super::BatchUrl;
use crate::config::BrowserConfig;
use crate::schema::SchemaStore;
use crate::{Result, SiftError};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, Headers, ResourceType, SetBlockedUrLsParams, SetExtraHttpHeadersParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use futures::future::join_all;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Resource types failed before they hit the network
const BLOCKED_RESOURCE_TYPES: [ResourceType; 4] = [
    ResourceType::Stylesheet,
    ResourceType::Font,
    ResourceType::Media,
    ResourceType::Other,
];

/// URL patterns the page never needs for extraction
const BLOCKED_URL_PATTERNS: [&str; 5] = ["*.ico", "*.svg", "*.css", "*.json", "*.xml"];

/// Fetches pages through a real browser
pub struct BrowserFetcher {
    config: BrowserConfig,
    schemas: Arc<SchemaStore>,
    session: Option<BrowserSession>,
}

impl BrowserFetcher {
    /// Creates the strategy; the browser itself starts with the first batch
    pub fn new(config: BrowserConfig, schemas: Arc<SchemaStore>) -> Self {
        Self {
            config,
            schemas,
            session: None,
        }
    }
}

#[async_trait]
impl FetchStrategy for BrowserFetcher {
    async fn fetch_batch(&mut self, batch: &[BatchUrl]) -> Result<Vec<FetchOutcome>> {
        if self.session.is_none() {
            self.session = Some(BrowserSession::launch(&self.config).await?);
        }
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| SiftError::Browser("browser session unavailable".to_string()))?;

        let timeout = self.config.navigation_timeout();
        let schemas = &self.schemas;
        let pages = batch
            .iter()
            .map(|target| session.fetch_page(target, schemas.root_selector(&target.site), timeout));

        Ok(join_all(pages).await)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut fetcher = *self;
        if let Some(mut session) = fetcher.session.take() {
            session.shutdown().await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// A launched browser, its CDP event loop and the session's private context
struct BrowserSession {
    browser: Browser,
    context: BrowserContextId,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = chromiumoxide::BrowserConfig::builder()
            .request_timeout(config.navigation_timeout());

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        for arg in &config.args {
            builder = builder.arg(arg.as_str());
        }

        let browser_config = builder.build().map_err(SiftError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SiftError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let context = match browser
            .execute(CreateBrowserContextParams::default())
            .await
        {
            Ok(response) => response.result.browser_context_id,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(SiftError::Browser(format!(
                    "Failed to create browser context: {}",
                    e
                )));
            }
        };

        tracing::info!(headless = config.headless, "Browser launched");
        Ok(Self {
            browser,
            context,
            handler,
        })
    }

    /// Loads one URL in a fresh page and returns its outcome
    async fn fetch_page(
        &self,
        target: &BatchUrl,
        root_selector: Option<&str>,
        timeout: Duration,
    ) -> FetchOutcome {
        let url = target.as_str();

        let page = match self.new_page().await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to open page");
                return FetchOutcome::Skipped;
            }
        };

        let interceptor = match install_resource_filter(&page).await {
            Ok(interceptor) => Some(interceptor),
            Err(e) => {
                tracing::debug!(url, error = %e, "Resource filter unavailable");
                None
            }
        };

        let outcome = match load_page(&page, target, root_selector, timeout).await {
            Ok(outcome) => outcome,
            Err(e) => navigation_failure(url, &e),
        };

        if let Err(e) = page.close().await {
            tracing::debug!(url, error = %e, "Failed to close page");
        }
        if let Some(interceptor) = interceptor {
            interceptor.abort();
        }
        outcome
    }

    async fn new_page(&self) -> std::result::Result<Page, CdpError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context.clone())
            .build()
            .map_err(CdpError::msg)?;
        self.browser.new_page(params).await
    }

    /// Disposes the context and stops the browser; errors are only logged
    async fn shutdown(&mut self) {
        if let Err(e) = self
            .browser
            .execute(DisposeBrowserContextParams::new(self.context.clone()))
            .await
        {
            tracing::debug!(error = %e, "Failed to dispose browser context");
        }
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "Failed to wait for browser exit");
        }
        tracing::info!("Browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Browser::drop kills the child process if shutdown never ran
        self.handler.abort();
    }
}

/// Maps a failed page load to a skip; CDP request timeouts are expected and
/// only logged at debug
fn navigation_failure(url: &str, error: &CdpError) -> FetchOutcome {
    if matches!(error, CdpError::Timeout) {
        tracing::debug!(url, "Browser request timed out");
    } else {
        tracing::warn!(url, error = %error, "Browser fetch failed");
    }
    FetchOutcome::Skipped
}

/// Navigates, classifies the response, and reads the page HTML
async fn load_page(
    page: &Page,
    target: &BatchUrl,
    root_selector: Option<&str>,
    timeout: Duration,
) -> std::result::Result<FetchOutcome, CdpError> {
    let url = target.as_str();
    apply_headers(page).await?;

    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(navigation) => {
            navigation?;
        }
        Err(_) => {
            tracing::debug!(url, timeout_secs = timeout.as_secs(), "Navigation timed out");
            return Ok(FetchOutcome::Skipped);
        }
    }

    let status = page
        .wait_for_navigation_response()
        .await?
        .and_then(|request| request.response.as_ref().map(|response| response.status));
    let Some(status) = status.and_then(|s| u16::try_from(s).ok()) else {
        tracing::debug!(url, "Navigation produced no response");
        return Ok(FetchOutcome::Skipped);
    };

    if !classify_response(url, status).is_accept() {
        return Ok(FetchOutcome::Status(status));
    }

    let Some(selector) = root_selector else {
        return Ok(FetchOutcome::Body(page.content().await?));
    };

    let html: Option<String> = page
        .evaluate(root_html_script(selector))
        .await?
        .into_value()?;

    match html {
        Some(html) => Ok(FetchOutcome::Body(html)),
        None => {
            tracing::warn!(url, selector, site = %target.site, "Root selector matched nothing");
            Ok(FetchOutcome::Skipped)
        }
    }
}

/// Overrides the user agent and adds the remaining randomized headers
async fn apply_headers(page: &Page) -> std::result::Result<(), CdpError> {
    let mut extra = Map::new();
    let mut user_agent = None;
    for (name, value) in random_headers() {
        if name == "user-agent" {
            user_agent = Some(value);
        } else {
            extra.insert(name.to_string(), Value::String(value));
        }
    }

    if let Some(user_agent) = user_agent {
        page.execute(SetUserAgentOverrideParams::new(user_agent)).await?;
    }
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(Value::Object(extra))))
        .await?;
    Ok(())
}

/// Fails stylesheet, font, media and other requests, and blocks static
/// asset URL patterns
///
/// Returns the task answering paused requests; it ends with the page.
async fn install_resource_filter(page: &Page) -> std::result::Result<JoinHandle<()>, CdpError> {
    let patterns: Vec<String> = BLOCKED_URL_PATTERNS.iter().map(|p| p.to_string()).collect();
    page.execute(SetBlockedUrLsParams::new(patterns)).await?;

    let mut paused = page.event_listener::<EventRequestPaused>().await?;

    let request_patterns: Vec<RequestPattern> = BLOCKED_RESOURCE_TYPES
        .iter()
        .map(|resource| {
            RequestPattern::builder()
                .url_pattern("*")
                .resource_type(resource.clone())
                .build()
        })
        .collect();
    page.execute(EnableParams::builder().patterns(request_patterns).build())
        .await?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let blocked = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
            if let Err(e) = page.execute(blocked).await {
                tracing::trace!(error = %e, "Failed to block request");
            }
        }
    }))
}

/// JavaScript returning the inner HTML of the first element matching
/// `selector`, or null
///
/// Selectors starting with `/`, `(` or `xpath=` are evaluated as XPath,
/// everything else as CSS.
fn root_html_script(selector: &str) -> String {
    let literal = Value::String(selector.to_string());
    format!(
        r#"(() => {{
    const sel = {literal};
    let el = null;
    if (sel.startsWith('xpath=') || sel.startsWith('/') || sel.startsWith('(')) {{
        const expr = sel.startsWith('xpath=') ? sel.slice(6) : sel;
        el = document.evaluate(expr, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
    }} else {{
        el = document.querySelector(sel);
    }}
    return el ? el.innerHTML : null;
}})()"#
    )
}
