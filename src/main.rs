//! Sift-Scrape main entry point
//!
//! This is the command-line interface for the Sift-Scrape batch scraper.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use sift_scrape::config::{load_config, validate, FetchMode, SessionConfig};
use sift_scrape::output::{emit_results, print_statistics};
use sift_scrape::pipeline::{BatchScheduler, BatchUrl, Coordinator};
use sift_scrape::schema::{load_schema_with_hash, SchemaStore};
use sift_scrape::url::load_url_list;
use tracing_subscriber::EnvFilter;

/// Sift-Scrape: a schema-driven batch scraper
///
/// Sift-Scrape fetches a list of pages in small, site-interleaved batches
/// and extracts structured fields from each one according to a per-site
/// JSON schema.
#[derive(Parser, Debug)]
#[command(name = "sift-scrape")]
#[command(version = "1.0.0")]
#[command(about = "A schema-driven batch scraper", long_about = None)]
struct Cli {
    /// Path to the JSON scraping schema
    #[arg(value_name = "SCHEMA")]
    schema: PathBuf,

    /// Path to a text file with one URL per line
    #[arg(value_name = "URLS")]
    urls: PathBuf,

    /// Path to TOML session configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// URLs fetched concurrently per batch
    #[arg(short, long, value_name = "N")]
    batch_size: Option<usize>,

    /// Seconds to wait between batches
    #[arg(short, long, value_name = "SECS")]
    delay: Option<u64>,

    /// Fetch pages with a headless browser instead of plain HTTP
    #[arg(long)]
    browser: bool,

    /// Write results to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate inputs and show the batch plan without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    tracing::info!("Loading schema from: {}", cli.schema.display());
    let (schemas, schema_hash) = load_schema_with_hash(&cli.schema)
        .with_context(|| format!("Failed to load schema {}", cli.schema.display()))?;
    tracing::info!(
        "Schema loaded: {} sites (hash: {})",
        schemas.len(),
        schema_hash
    );

    let urls = load_url_list(&cli.urls)
        .with_context(|| format!("Failed to read URL list {}", cli.urls.display()))?;
    tracing::info!("Loaded {} URLs", urls.len());

    if cli.dry_run {
        return handle_dry_run(&urls, &schemas, &config);
    }

    handle_session(&cli, &urls, schemas, &config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sift_scrape=info,warn"),
            1 => EnvFilter::new("sift_scrape=debug,info"),
            2 => EnvFilter::new("sift_scrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the optional config file and applies command line overrides
fn build_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    if let Some(batch_size) = cli.batch_size {
        config.session.batch_size = batch_size;
    }
    if let Some(delay) = cli.delay {
        config.session.batch_delay_secs = delay;
    }
    if cli.browser {
        config.session.mode = FetchMode::Browser;
    }

    validate(&config).context("Invalid session settings")?;
    Ok(config)
}

/// Handles the --dry-run mode: validates inputs and shows the batch plan
fn handle_dry_run(urls: &[String], schemas: &SchemaStore, config: &SessionConfig) -> Result<()> {
    let targets = urls
        .iter()
        .map(|raw| BatchUrl::parse(raw))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    println!("=== Sift-Scrape Dry Run ===\n");

    println!("Session:");
    println!("  Mode: {:?}", config.session.mode);
    println!("  Batch size: {}", config.session.batch_size);
    println!("  Batch delay: {}s", config.session.batch_delay_secs);
    println!("  Extraction workers: {}", config.session.worker_count());

    println!("\nSchema Sites ({}):", schemas.len());
    for site in schemas.site_names() {
        let schema = schemas.get(site);
        let response_type = schema.map(|s| s.response_type.as_str()).unwrap_or("?");
        println!("  - {} ({})", site, response_type);
    }

    let unknown: Vec<&BatchUrl> = targets.iter().filter(|t| !schemas.contains(&t.site)).collect();

    let mut scheduler = BatchScheduler::new(targets.clone(), &config.session)?;
    println!("\nBatches ({}):", scheduler.total_batches());
    while let Some(batch) = scheduler.next_batch() {
        println!("  Batch {}:", scheduler.batch_number());
        for target in &batch {
            println!("    * [{}] {}", target.site, target.as_str());
        }
    }

    if !unknown.is_empty() {
        println!("\nURLs without a schema ({}):", unknown.len());
        for target in unknown {
            println!("  - {}", target.as_str());
        }
    }

    println!("\n✓ Inputs are valid");
    println!("✓ Would fetch {} URLs", targets.len());

    Ok(())
}

/// Handles the main scraping session
async fn handle_session(
    cli: &Cli,
    urls: &[String],
    schemas: SchemaStore,
    config: &SessionConfig,
) -> Result<()> {
    let coordinator = Coordinator::new(urls, schemas, config)?;
    let report = coordinator.run().await;

    if let Some(error) = &report.error {
        tracing::error!("Session ended early, writing partial results: {}", error);
    }

    emit_results(&report.results, cli.output.as_deref()).context("Failed to write results")?;
    if let Some(path) = &cli.output {
        tracing::info!("Results written to: {}", path.display());
    }

    if !cli.quiet {
        print_statistics(&report.stats);
    }

    Ok(())
}
