use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for a scraping session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub session: BatchConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
}

/// Which fetch strategy a session uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Lightweight concurrent HTTP requests
    #[default]
    Http,
    /// Full browser automation over CDP
    Browser,
}

/// Batch scheduling and pacing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of URLs fetched concurrently per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Pause between batches (seconds)
    #[serde(rename = "batch-delay-secs")]
    pub batch_delay_secs: u64,

    /// Fetch strategy
    pub mode: FetchMode,

    /// Maximum parallel extraction workers; 0 means available parallelism
    #[serde(rename = "extraction-workers")]
    pub extraction_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_delay_secs: 10,
            mode: FetchMode::Http,
            extraction_workers: 0,
        }
    }
}

impl BatchConfig {
    /// The inter-batch delay as a Duration
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    /// Resolves the extraction worker count against the host's parallelism
    pub fn worker_count(&self) -> usize {
        if self.extraction_workers > 0 {
            return self.extraction_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Lightweight HTTP strategy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Browser strategy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Page navigation timeout (seconds)
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,

    /// Explicit Chrome/Chromium executable; auto-detected when absent
    pub executable: Option<PathBuf>,

    /// Extra command line arguments passed to the browser
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 30,
            executable: None,
            args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}
