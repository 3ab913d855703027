//! Output handler traits and types
//!
//! This module defines the trait interface for result writers and the
//! errors they report.

use crate::pipeline::SessionResults;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for writing session results somewhere
pub trait OutputHandler {
    /// Writes the complete results of a session
    fn write_results(&mut self, results: &SessionResults) -> OutputResult<()>;

    /// Flushes any buffered output
    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
