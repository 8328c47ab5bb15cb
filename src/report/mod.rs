//! CSV report sink
//!
//! Append-only, semicolon-separated. Rows arrive from many workers at once;
//! a mutex serializes every write. The file is created truncating and starts
//! with a fixed header.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use csv::{Writer, WriterBuilder};

/// Column order of the report
pub const HEADER: [&str; 7] = [
    "code",
    "url",
    "redirect",
    "source",
    "title",
    "h1",
    "description",
];

/// One classified crawl outcome
///
/// `code` is the HTTP status, or the synthetic 310 marking a page skipped in
/// favor of its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub code: u16,
    pub url: String,
    pub redirect: String,
    pub source: String,
    pub title: String,
    pub h1: String,
    pub description: String,
}

impl ReportRow {
    /// A row without metadata (redirect hops, error statuses, canonical skips)
    pub fn bare(code: u16, url: String, redirect: String, source: String) -> Self {
        Self {
            code,
            url,
            redirect,
            source,
            title: String::new(),
            h1: String::new(),
            description: String::new(),
        }
    }
}

/// Shared append-only CSV writer
pub struct CsvReport {
    writer: Mutex<Writer<File>>,
}

impl CsvReport {
    /// Creates the report file, truncating any previous one, and writes the
    /// header row
    pub fn create(path: impl AsRef<Path>) -> crate::Result<Self> {
        let mut writer = WriterBuilder::new().delimiter(b';').from_path(path)?;
        writer.write_record(HEADER)?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    /// Appends one row
    pub fn append(&self, row: &ReportRow) -> Result<(), csv::Error> {
        let code = row.code.to_string();
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write_record([
            code.as_str(),
            row.url.as_str(),
            row.redirect.as_str(),
            row.source.as_str(),
            row.title.as_str(),
            row.h1.as_str(),
            row.description.as_str(),
        ])
    }

    /// Flushes buffered rows to disk
    pub fn flush(&self) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.flush()
    }
}
