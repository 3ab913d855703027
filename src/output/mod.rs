//! Output module for session results and summaries
//!
//! This module handles:
//! - Writing the result accumulator as JSON
//! - Recording and printing session statistics

mod json;
pub mod stats;
mod traits;

pub use json::{write_results, JsonOutput};
pub use stats::{print_statistics, SessionStats};
pub use traits::{OutputError, OutputHandler, OutputResult};

use crate::pipeline::SessionResults;
use std::path::Path;

/// Writes results to `path`, or to stdout when no path is given
///
/// # Arguments
///
/// * `results` - The session results
/// * `path` - Destination file, truncated if it exists
///
/// # Returns
///
/// * `Ok(())` - Results written and flushed
/// * `Err(OutputError)` - The file could not be written
pub fn emit_results(results: &SessionResults, path: Option<&Path>) -> OutputResult<()> {
    let mut handler: Box<dyn OutputHandler> = match path {
        Some(path) => Box::new(JsonOutput::create(path)?),
        None => Box::new(JsonOutput::stdout()),
    };
    handler.write_results(results)?;
    handler.finish()
}
