//! Crawl engine
//!
//! Orchestrates fetching, extraction, classification and reporting. Every
//! visit runs as its own tokio task under the limiter's parallelism cap; new
//! visits are dispatched from inside running ones, so the frontier unwinds
//! recursively. The engine follows redirect chains itself, one reported hop
//! at a time, and applies the canonical-URL policy to scraped pages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::context::{Link, VisitContext};
use super::extractor::{collapse_whitespace, extract};
use super::fetcher::{FetchOutcome, FetchedPage, Fetcher};
use super::limiter::RateLimiter;
use crate::report::{CsvReport, ReportRow};

/// Statuses the engine follows as redirects
///
/// 300 and 303 are intentionally absent and fall through to the error
/// branch; see DESIGN.md.
const REDIRECT_STATUSES: [u16; 4] = [301, 302, 307, 308];

/// Statuses that signal origin overload and trigger delay adaptation + retry
const OVERLOAD_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Synthetic report code for pages skipped in favor of their canonical URL
const CANONICAL_SKIP_CODE: u16 = 310;

/// Cheap handle to one crawl run; clones share all state
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Fetcher,
    limiter: RateLimiter,
    report: Arc<CsvReport>,
    max_redirects: u32,
    max_pages: u64,

    /// Pages effectively dispatched; advisory bound, small overshoot tolerated
    total: AtomicU64,

    /// Visits spawned but not yet finished
    in_flight: AtomicU64,

    next_request_id: AtomicU64,
}

impl Engine {
    pub fn new(
        fetcher: Fetcher,
        limiter: RateLimiter,
        report: Arc<CsvReport>,
        max_redirects: u32,
        max_pages: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                limiter,
                report,
                max_redirects,
                max_pages,
                total: AtomicU64::new(0),
                in_flight: AtomicU64::new(0),
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    /// Crawls from the seed until no visit is in flight
    pub async fn run(&self, seed: Url) {
        self.dispatch(VisitContext::seed(seed));
        self.wait_until_idle().await;
    }

    /// The single dispatch primitive
    ///
    /// Rejects silently when the redirect budget or the page budget is
    /// spent, or when the fetcher refuses the URL. On admission the page
    /// counter moves and a worker task is spawned.
    fn dispatch(&self, ctx: VisitContext) {
        let inner = &self.inner;

        if ctx.redirects > inner.max_redirects {
            tracing::trace!("skip {} (redirect budget spent)", ctx.url);
            return;
        }
        if inner.total.load(Ordering::SeqCst) >= inner.max_pages {
            tracing::trace!("skip {} (page budget spent)", ctx.url);
            return;
        }
        if let Err(refusal) = inner.fetcher.admit(&ctx.url, ctx.depth) {
            tracing::trace!("skip {} ({})", ctx.url, refusal);
            return;
        }

        inner.total.fetch_add(1, Ordering::SeqCst);
        inner.in_flight.fetch_add(1, Ordering::SeqCst);

        let engine = self.clone();
        tokio::spawn(async move {
            engine.process(ctx).await;
            engine.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Runs one visit to completion, retrying through overload statuses
    async fn process(&self, ctx: VisitContext) {
        let inner = &self.inner;
        let id = inner.next_request_id.fetch_add(1, Ordering::SeqCst);

        loop {
            let Ok(_permit) = inner.limiter.acquire().await else {
                return;
            };
            inner.limiter.pause().await;

            match inner.fetcher.fetch(&ctx.url).await {
                FetchOutcome::NetworkError(kind) => {
                    tracing::warn!("Request #{} ERROR: {}", id, kind);
                    return;
                }
                FetchOutcome::Response(page) => {
                    if OVERLOAD_STATUSES.contains(&page.status) {
                        inner.limiter.on_overload(page.status);
                        continue;
                    }
                    // the permit is held through classification so rows land
                    // in dispatch order when the crawl is single-threaded
                    self.classify(ctx, page, id);
                    return;
                }
            }
        }
    }

    /// Takes exactly one classification branch for a completed exchange
    fn classify(&self, ctx: VisitContext, page: FetchedPage, id: u64) {
        if REDIRECT_STATUSES.contains(&page.status) {
            self.follow_redirect(&ctx, &page, id);
        } else if page.status >= 400 {
            tracing::info!(
                "Request #{} ({}) [{}] {}",
                id,
                ctx.depth,
                page.status,
                ctx.url
            );
            self.write_row(ReportRow::bare(
                page.status,
                ctx.url.to_string(),
                String::new(),
                ctx.source,
            ));
        } else {
            self.scraped(ctx, &page, id);
        }
    }

    /// Redirect branch: report the hop and dispatch the next one
    ///
    /// The child keeps the original `source`, not the redirecting URL: the
    /// whole chain belongs to the page that referred to it.
    fn follow_redirect(&self, ctx: &VisitContext, page: &FetchedPage, id: u64) {
        let location = page
            .headers
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| ctx.url.join(value).ok());

        let Some(location) = location else {
            tracing::debug!(
                "Request #{} [{}] {} without location",
                id,
                page.status,
                ctx.url
            );
            return;
        };

        tracing::info!(
            "Request #{} ({}) [{}] {} -> {}",
            id,
            ctx.depth,
            page.status,
            ctx.url,
            location
        );

        let hop = Link {
            url: location.clone(),
            redirects: ctx.redirects + 1,
        };
        self.dispatch(VisitContext::child(ctx.source.clone(), ctx.depth + 1, &hop));

        self.write_row(ReportRow::bare(
            page.status,
            ctx.url.to_string(),
            location.to_string(),
            ctx.source.clone(),
        ));
    }

    /// Success branch: extract, apply the canonical policy, expand and report
    fn scraped(&self, mut ctx: VisitContext, page: &FetchedPage, id: u64) {
        self.inner.limiter.on_success(page.status);

        ctx.meta = extract(&page.body, &ctx.url);

        let url = ctx.url.to_string();
        let canonical = ctx.meta.canonical().to_string();

        if !canonical.is_empty() && canonical != url {
            tracing::info!(
                "Skip #{} ({}) [{}] {} CANONICAL: {}",
                id,
                ctx.depth,
                page.status,
                url,
                canonical
            );

            if let Ok(target) = ctx.url.join(&canonical) {
                self.dispatch(VisitContext::child(
                    url.clone(),
                    ctx.depth + 1,
                    &Link::discovered(target),
                ));
            }

            self.write_row(ReportRow::bare(
                CANONICAL_SKIP_CODE,
                url,
                canonical,
                ctx.source,
            ));
            return;
        }

        tracing::info!("Request #{} ({}) [{}] {}", id, ctx.depth, page.status, url);

        for link in &ctx.meta.links {
            self.dispatch(VisitContext::child(url.clone(), ctx.depth + 1, link));
        }

        self.write_row(ReportRow {
            code: page.status,
            url,
            redirect: String::new(),
            source: ctx.source,
            title: collapse_whitespace(ctx.meta.title()),
            h1: collapse_whitespace(ctx.meta.h1()),
            description: collapse_whitespace(ctx.meta.description()),
        });
    }

    fn write_row(&self, row: ReportRow) {
        if let Err(e) = self.inner.report.append(&row) {
            tracing::error!("Failed to append report row for {}: {}", row.url, e);
        }
    }

    /// Waits until no visit is in flight
    ///
    /// Double-checks after a short sleep: a finishing task may dispatch
    /// follow-ups right before its counter decrement.
    async fn wait_until_idle(&self) {
        loop {
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Pages dispatched so far
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::SeqCst)
    }

    /// The crawl-wide rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }
}
