//! Site-Auditor: a single-site link-health and SEO-metadata crawler
//!
//! This crate implements a crawler that visits every page reachable under one
//! host, classifies each HTTP outcome, and appends one row per observed URL to
//! a semicolon-separated CSV report. Inter-request delays adapt to origin
//! pressure so the crawl stays polite under load.

pub mod config;
pub mod crawler;
pub mod report;
pub mod robots;

use thiserror::Error;

/// Main error type for Site-Auditor operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while validating the command line
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot parse url: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("Start url must be an absolute url (starting with https/http protocol): {0}")]
    NotAbsolute(String),

    #[error("Start url has no host")]
    MissingHost,

    #[error("Must specify username:password in url")]
    MissingPassword,
}

/// Result type alias for Site-Auditor operations
pub type Result<T> = std::result::Result<T, AuditError>;

// Re-export commonly used types
pub use config::{CrawlParams, Seed};
pub use crawler::{crawl, Engine};
pub use report::{CsvReport, ReportRow};
