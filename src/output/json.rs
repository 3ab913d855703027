//! JSON results writer

use super::traits::{OutputHandler, OutputResult};
use crate::pipeline::SessionResults;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes session results as pretty-printed JSON
pub struct JsonOutput<W: Write> {
    writer: W,
}

impl<W: Write> JsonOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonOutput<BufWriter<File>> {
    /// Creates (or truncates) the output file
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl JsonOutput<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> OutputHandler for JsonOutput<W> {
    fn write_results(&mut self, results: &SessionResults) -> OutputResult<()> {
        write_results(results, &mut self.writer)
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Serializes results as pretty JSON followed by a newline
///
/// # Example
///
/// ```
/// use sift_scrape::output::write_results;
/// use sift_scrape::pipeline::{PageOutcome, SessionResults};
///
/// let mut results = SessionResults::new();
/// results.push("shop", PageOutcome::Status(404));
///
/// let mut buf = Vec::new();
/// write_results(&results, &mut buf).unwrap();
/// assert_eq!(String::from_utf8(buf).unwrap(), "{\n  \"shop\": [\n    404\n  ]\n}\n");
/// ```
pub fn write_results<W: Write>(results: &SessionResults, writer: &mut W) -> OutputResult<()> {
    serde_json::to_writer_pretty(&mut *writer, results)?;
    writeln!(writer)?;
    Ok(())
}
