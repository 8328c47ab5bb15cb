//! Crawler module
//!
//! Core crawl machinery:
//! - per-visit request context and the lazy frontier
//! - adaptive rate limiting
//! - HTTP fetching with engine-driven redirects and digest auth
//! - HTML extraction into the context
//! - the engine tying it all together

mod context;
mod engine;
mod extractor;
mod fetcher;
mod limiter;

pub use context::{Link, PageMeta, VisitContext};
pub use engine::Engine;
pub use extractor::extract;
pub use fetcher::{build_http_client, FetchOutcome, Fetcher, Refusal, USER_AGENT};
pub use limiter::RateLimiter;

use std::sync::Arc;

use crate::config::{CrawlParams, Seed};
use crate::report::CsvReport;
use crate::robots;

/// Runs a complete crawl from the seed
///
/// Builds the HTTP client, loads robots.txt for the seed host, assembles the
/// engine and drives it until the frontier drains.
///
/// # Returns
///
/// The number of pages dispatched.
pub async fn crawl(
    params: CrawlParams,
    seed: Seed,
    report: Arc<CsvReport>,
) -> crate::Result<u64> {
    let client = build_http_client()?;

    let robots = robots::fetch_robots(&client, &seed.url, USER_AGENT).await;

    let fetcher = Fetcher::new(client, &seed, robots, params.max_depth)?;
    let limiter = RateLimiter::new(params.delay, params.threads);
    let engine = Engine::new(
        fetcher,
        limiter,
        report,
        params.max_redirects,
        params.max_pages,
    );

    engine.run(seed.url.clone()).await;

    Ok(engine.total())
}
