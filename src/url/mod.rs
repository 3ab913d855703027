//! URL handling module for Sift-Scrape
//!
//! This module provides target URL validation and site identifier
//! derivation. The site identifier keys both the schema store and the
//! session results.

mod site;

use crate::UrlError;
use std::path::Path;
use url::Url;

// Re-export main functions
pub use site::{site_name, site_name_str};

/// Parses and validates a target URL
///
/// Target URLs must be absolute HTTP(S) URLs with a host.
///
/// # Arguments
///
/// * `raw` - The URL string to parse
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The URL is malformed, not HTTP(S), or has no host
///
/// # Examples
///
/// ```
/// use sift_scrape::url::parse_target;
///
/// assert!(parse_target("https://example.com/page").is_ok());
/// assert!(parse_target("ftp://example.com/file").is_err());
/// ```
pub fn parse_target(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| UrlError::Parse {
        url: raw.to_string(),
        message: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    Ok(url)
}

/// Reads a URL list file
///
/// One URL per line; blank lines and lines starting with `#` are skipped.
/// Lines are returned trimmed but otherwise unvalidated.
pub fn load_url_list(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_url_list(&content))
}

/// Splits URL list text into entries
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
