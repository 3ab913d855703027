//! HTML extraction engine
//!
//! This module turns a fetched page body and its site's schema into a
//! structured JSON object:
//! - Tag step matching against the parsed document
//! - Single, attribute, and repeated-record resolution
//! - Per-field failure isolation

mod engine;
mod matcher;

pub use engine::{extract_field, extract_fields};
pub use matcher::{find_first, find_matches, text_content, Scope};

use crate::schema::{ResponseType, SiteSchema};
use scraper::Html;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a field or page could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no element matching {step} for field '{field}'")]
    NoMatch { field: String, step: String },

    #[error("attribute '{attribute}' missing on element for field '{field}'")]
    MissingAttribute { field: String, attribute: String },

    #[error("cannot scrape response type ({response_type}) on ({site})")]
    UnsupportedResponseType {
        site: String,
        response_type: ResponseType,
    },

    #[error("no scraping schema for site '{0}'")]
    UnknownSite(String),
}

impl ExtractError {
    /// True when the field is simply not present on the page, as opposed to
    /// a schema/document mismatch or an unsupported configuration
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NoMatch { .. })
    }
}

/// Extracts every schema field from a page body
///
/// # Arguments
///
/// * `site` - Site identifier, used in error reports
/// * `body` - Raw HTML (a full document or a fragment)
/// * `schema` - The site's extraction schema
///
/// # Returns
///
/// * `Ok(Map)` - Field values keyed by output name; missing fields are `null`
/// * `Err(ExtractError::UnsupportedResponseType)` - The schema is not HTML
///
/// # Example
///
/// ```
/// use sift_scrape::extract::extract_page;
/// use sift_scrape::schema::parse_schema;
///
/// let store = parse_schema(r#"{ "shop": { "type": "html", "data": {
///     "price": { "item-data": [ { "tag": "span", "class": "price", "attr": ".text" } ] }
/// } } }"#).unwrap();
///
/// let fields = extract_page("shop", r#"<span class="price">$9</span>"#, store.get("shop").unwrap()).unwrap();
/// assert_eq!(fields["price"], "$9");
/// ```
pub fn extract_page(
    site: &str,
    body: &str,
    schema: &SiteSchema,
) -> Result<Map<String, Value>, ExtractError> {
    if schema.response_type != ResponseType::Html {
        return Err(ExtractError::UnsupportedResponseType {
            site: site.to_string(),
            response_type: schema.response_type,
        });
    }

    let document = Html::parse_document(body);
    Ok(extract_fields(Scope::document(&document), &schema.fields))
}
