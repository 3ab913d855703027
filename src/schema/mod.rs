//! Scraping schema module
//!
//! This module loads the per-site extraction schema from JSON and holds it
//! in a read-only [`SchemaStore`]. The store is built once before a session
//! starts and shared between extraction workers behind an `Arc`.
//!
//! # Schema format
//!
//! ```json
//! {
//!   "example": {
//!     "type": "html",
//!     "xpath": "#content",
//!     "data": {
//!       "price": { "item-data": [ { "tag": "span", "class": "price", "attr": ".text" } ] }
//!     }
//!   }
//! }
//! ```

mod parser;
mod types;

use std::collections::HashMap;

pub use parser::{load_schema, load_schema_with_hash, parse_schema, schema_from_value};
pub use types::{
    AttrFilter, Cardinality, FieldSpec, Leaf, ResponseType, SiteSchema, TagStep, MULTIPLE_MARKER,
    TEXT_DIRECTIVE,
};

/// Read-only mapping from site identifier to its extraction schema
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    sites: HashMap<String, SiteSchema>,
}

impl SchemaStore {
    pub fn new(sites: HashMap<String, SiteSchema>) -> Self {
        Self { sites }
    }

    /// Looks up the schema for a site identifier
    pub fn get(&self, site: &str) -> Option<&SiteSchema> {
        self.sites.get(site)
    }

    pub fn contains(&self, site: &str) -> bool {
        self.sites.contains_key(site)
    }

    /// Root selector the browser strategy should extract for a site
    pub fn root_selector(&self, site: &str) -> Option<&str> {
        self.get(site).and_then(|s| s.root_selector.as_deref())
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Site identifiers with a schema, sorted
    pub fn site_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sites.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
