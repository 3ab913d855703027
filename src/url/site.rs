use url::{Host, Url};

/// Derives the canonical site identifier from a URL
///
/// The site identifier is the registrable domain label of the host and is
/// used both as the schema lookup key and as the result grouping key.
///
/// # Rules
///
/// - IP literals and single-label hosts (e.g. `localhost`) are returned whole
/// - Otherwise the label directly left of the public suffix is taken, so
///   `news.example.co.uk` and `a.b.example.com` both give `example`
/// - A host that is itself a public suffix (e.g. `co.uk`) gives its first label
///
/// # Arguments
///
/// * `url` - The URL to derive the site identifier from
///
/// # Returns
///
/// * `Some(String)` - The lowercase site identifier
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sift_scrape::url::site_name;
///
/// let url = Url::parse("https://www.example.com/path").unwrap();
/// assert_eq!(site_name(&url), Some("example".to_string()));
///
/// let url = Url::parse("https://shop.com/item/1").unwrap();
/// assert_eq!(site_name(&url), Some("shop".to_string()));
/// ```
pub fn site_name(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            let registrable = psl::domain_str(&domain).unwrap_or(&domain);
            registrable
                .split('.')
                .find(|label| !label.is_empty())
                .map(str::to_string)
        }
    }
}

/// Convenience wrapper for raw URL strings
///
/// Returns None if the string is not a valid URL or has no host.
pub fn site_name_str(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(site_name)
}
