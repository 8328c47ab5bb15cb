//! Site-Auditor command-line entry point

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use site_auditor::config::{self, CrawlParams};
use site_auditor::report::CsvReport;
use tracing_subscriber::EnvFilter;

/// Crawl one site and audit every reachable page into a CSV report
///
/// Visits all pages under the seed URL's host, records each response's
/// status and SEO metadata (title, first H1, meta description, canonical)
/// and writes one semicolon-separated row per observed URL to
/// `<host>.csv` in the working directory.
#[derive(Parser, Debug)]
#[command(name = "site-auditor")]
#[command(version)]
#[command(about = "Single-site link-health and SEO-metadata auditor", long_about = None)]
struct Cli {
    /// Absolute start URL, e.g. https://domain.tld/
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Maximum number of threads
    #[arg(long, default_value_t = 5)]
    threads: usize,

    /// Maximum crawling depth
    #[arg(long, default_value_t = 7)]
    depth: u32,

    /// Maximum number of recursive redirects
    #[arg(long, default_value_t = 5)]
    redirects: u32,

    /// Max pages to check
    #[arg(long, default_value_t = 10_000)]
    pages: u64,

    /// Random delay between requests, in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let cli = Cli::parse();

    let Some(raw_url) = cli.url else {
        // missing URL prints usage, not an error trace
        let _ = Cli::command().print_help();
        return ExitCode::from(1);
    };

    let seed = match config::parse_seed(&raw_url) {
        Ok(seed) => seed,
        Err(e) => {
            println!("{e}");
            return ExitCode::from(1);
        }
    };

    let params = CrawlParams {
        threads: cli.threads,
        max_depth: cli.depth,
        max_redirects: cli.redirects,
        max_pages: cli.pages,
        delay: Duration::from_millis(cli.delay),
    };

    let report = match CsvReport::create(seed.output_filename()) {
        Ok(report) => Arc::new(report),
        Err(e) => {
            tracing::error!("Cannot create output file: {e}");
            return ExitCode::from(2);
        }
    };

    tracing::info!("Starting crawling {}: {}", seed.url, params);

    let outcome = tokio::select! {
        result = site_auditor::crawl(params, seed, Arc::clone(&report)) => Some(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, closing report");
            None
        }
    };

    if let Err(e) = report.flush() {
        tracing::error!("Failed to flush report: {e}");
        return ExitCode::from(2);
    }

    match outcome {
        Some(Ok(total)) => {
            tracing::info!("Crawl finished, {total} pages visited");
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            tracing::error!("Crawl failed: {e}");
            ExitCode::from(2)
        }
        // interrupted: the report is flushed, nothing else to drain
        None => ExitCode::SUCCESS,
    }
}

/// Sets up the tracing subscriber
///
/// Defaults to info-level output for the crate; `RUST_LOG` overrides.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("site_auditor=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
