//! HTTP fetcher
//!
//! Performs one request per call and surfaces the raw response to the
//! engine. Redirect handling is disabled at the HTTP layer: 3xx responses
//! are returned verbatim so the engine can follow and report each hop
//! itself. When the seed URL embedded credentials, every request carries
//! HTTP digest auth.
//!
//! The fetcher also owns the dispatch preconditions: same-host restriction,
//! the image-extension filter, the depth cap, robots.txt, and revisit
//! suppression. A URL that fails any of them is refused before a request is
//! made.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use diqwest::WithDigestAuth;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client};
use thiserror::Error;
use url::Url;

use crate::config::{Credentials, Seed};
use crate::robots::RobotsPolicy;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION")
);

/// URLs whose path matches this pattern are never fetched
const SKIP_PATTERN: &str = r"(?i)\.(jpg|jpeg|png|webp|gif|svg)$";

/// A completed HTTP exchange, any status included
#[derive(Debug)]
pub struct FetchedPage {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Result of one fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered; 3xx and 4xx/5xx land here too
    Response(FetchedPage),

    /// Transport failure, no HTTP status available
    NetworkError(String),
}

/// Why a dispatch was refused before any request went out
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Refusal {
    #[error("host differs from the seed host")]
    ForeignHost,

    #[error("path matches the disallowed URL pattern")]
    DisallowedPattern,

    #[error("maximum crawl depth reached")]
    DepthExceeded,

    #[error("disallowed by robots.txt")]
    RobotsDisallowed,

    #[error("already visited")]
    AlreadyVisited,
}

/// Single-host fetcher with dispatch preconditions
pub struct Fetcher {
    client: Client,
    credentials: Option<Credentials>,
    allowed_host: String,
    skip_pattern: Regex,
    max_depth: u32,
    robots: RobotsPolicy,
    visited: Mutex<HashSet<String>>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        seed: &Seed,
        robots: RobotsPolicy,
        max_depth: u32,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            client,
            credentials: seed.credentials.clone(),
            allowed_host: seed.host().to_string(),
            skip_pattern: Regex::new(SKIP_PATTERN)?,
            max_depth,
            robots,
            visited: Mutex::new(HashSet::new()),
        })
    }

    /// Checks every dispatch precondition and claims the URL on success
    ///
    /// Claiming happens at dispatch time, before any request goes out, so
    /// two workers can never race the same URL into flight.
    pub fn admit(&self, url: &Url, depth: u32) -> Result<(), Refusal> {
        if url.host_str() != Some(self.allowed_host.as_str()) {
            return Err(Refusal::ForeignHost);
        }
        if self.skip_pattern.is_match(url.path()) {
            return Err(Refusal::DisallowedPattern);
        }
        // a zero max depth means unlimited
        if self.max_depth > 0 && depth > self.max_depth {
            return Err(Refusal::DepthExceeded);
        }
        if !self.robots.is_allowed(url) {
            return Err(Refusal::RobotsDisallowed);
        }

        let mut visited = self.visited.lock().unwrap_or_else(|e| e.into_inner());
        if !visited.insert(url.as_str().to_string()) {
            return Err(Refusal::AlreadyVisited);
        }
        Ok(())
    }

    /// Performs one GET and reads the body
    ///
    /// Never follows redirects and never retries; classification of the
    /// status is the engine's concern.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let response = match &self.credentials {
            Some(creds) => self
                .client
                .get(url.as_str())
                .send_with_digest_auth(&creds.username, &creds.password)
                .await
                .map_err(|e| e.to_string()),
            None => self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(|e| e.to_string()),
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => return FetchOutcome::NetworkError(e),
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        match response.text().await {
            Ok(body) => FetchOutcome::Response(FetchedPage {
                status,
                headers,
                body,
            }),
            Err(e) => FetchOutcome::NetworkError(e.to_string()),
        }
    }
}

/// Builds the HTTP client shared by the whole crawl
///
/// Redirect handling is off at this layer; the engine follows and reports
/// each hop itself.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_seed;

    fn fetcher(seed: &str, max_depth: u32) -> Fetcher {
        let seed = parse_seed(seed).unwrap();
        Fetcher::new(
            build_http_client().unwrap(),
            &seed,
            RobotsPolicy::allow_all(USER_AGENT),
            max_depth,
        )
        .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_admit_same_host() {
        let f = fetcher("https://example.com/", 7);
        assert!(f.admit(&url("https://example.com/page"), 1).is_ok());
    }

    #[test]
    fn test_admit_refuses_foreign_host() {
        let f = fetcher("https://example.com/", 7);
        assert_eq!(
            f.admit(&url("https://other.com/page"), 1),
            Err(Refusal::ForeignHost)
        );
    }

    #[test]
    fn test_admit_refuses_image_paths() {
        let f = fetcher("https://example.com/", 7);
        for path in ["/a.jpg", "/a.JPEG", "/pics/b.png", "/c.webp", "/d.gif", "/e.SVG"] {
            let target = url(&format!("https://example.com{}", path));
            assert_eq!(f.admit(&target, 1), Err(Refusal::DisallowedPattern));
        }
    }

    #[test]
    fn test_admit_allows_image_like_query() {
        let f = fetcher("https://example.com/", 7);
        // the filter applies to the path only
        assert!(f.admit(&url("https://example.com/page?img=x.jpg"), 1).is_ok());
    }

    #[test]
    fn test_admit_refuses_beyond_max_depth() {
        let f = fetcher("https://example.com/", 3);
        assert!(f.admit(&url("https://example.com/d3"), 3).is_ok());
        assert_eq!(
            f.admit(&url("https://example.com/d4"), 4),
            Err(Refusal::DepthExceeded)
        );
    }

    #[test]
    fn test_admit_zero_depth_means_unlimited() {
        let f = fetcher("https://example.com/", 0);
        assert!(f.admit(&url("https://example.com/deep"), 1000).is_ok());
    }

    #[test]
    fn test_admit_refuses_robots_disallowed() {
        let seed = parse_seed("https://example.com/").unwrap();
        let robots =
            RobotsPolicy::from_content("User-agent: *\nDisallow: /private", USER_AGENT);
        let f = Fetcher::new(build_http_client().unwrap(), &seed, robots, 7).unwrap();
        assert_eq!(
            f.admit(&url("https://example.com/private/x"), 1),
            Err(Refusal::RobotsDisallowed)
        );
        assert!(f.admit(&url("https://example.com/public"), 1).is_ok());
    }

    #[test]
    fn test_admit_refuses_revisit() {
        let f = fetcher("https://example.com/", 7);
        let target = url("https://example.com/page");
        assert!(f.admit(&target, 1).is_ok());
        assert_eq!(f.admit(&target, 1), Err(Refusal::AlreadyVisited));
    }

    #[test]
    fn test_admit_ignores_port_differences_within_host() {
        // host comparison is by hostname, not authority
        let f = fetcher("http://127.0.0.1:8080/", 7);
        assert!(f.admit(&url("http://127.0.0.1:9090/x"), 1).is_ok());
    }
}
