//! Configuration module for Sift-Scrape
//!
//! This module handles loading, parsing, and validating the optional TOML
//! session configuration file. Every key has a default, so an absent file
//! behaves like an empty one.
//!
//! # Example
//!
//! ```no_run
//! use sift_scrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("session.toml")).unwrap();
//! println!("Batches of {} URLs", config.session.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BatchConfig, BrowserConfig, FetchMode, HttpConfig, SessionConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
pub(crate) use validation::validate_batch_config;
