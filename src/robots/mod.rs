//! robots.txt policy for the seed host
//!
//! The crawl targets a single host, so robots.txt is fetched once at startup
//! and consulted for every dispatch. A missing or unreadable robots.txt
//! allows everything.

use robotstxt::DefaultMatcher;
use url::Url;

/// Parsed robots.txt rules for the crawled host
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content; empty means allow all
    content: String,
    user_agent: String,
}

impl RobotsPolicy {
    /// Builds a policy from raw robots.txt content
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        Self {
            content: content.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// A permissive policy used when robots.txt cannot be fetched
    pub fn allow_all(user_agent: &str) -> Self {
        Self {
            content: String::new(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Checks whether a URL may be fetched under the host's rules
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.content.is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.user_agent, url.as_str())
    }
}

/// Fetches and parses robots.txt for the seed's host
///
/// Any failure (network error, non-success status, unreadable body) yields a
/// permissive policy; a crawl is never blocked by a broken robots.txt.
pub async fn fetch_robots(
    client: &reqwest::Client,
    seed: &Url,
    user_agent: &str,
) -> RobotsPolicy {
    let mut robots_url = seed.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    tracing::debug!("Fetching robots.txt from {}", robots_url);

    match client.get(robots_url.as_str()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(content) => RobotsPolicy::from_content(&content, user_agent),
            Err(e) => {
                tracing::warn!("Failed to read robots.txt body: {}, allowing all", e);
                RobotsPolicy::allow_all(user_agent)
            }
        },
        Ok(response) => {
            tracing::debug!(
                "robots.txt not available (status {}), allowing all",
                response.status()
            );
            RobotsPolicy::allow_all(user_agent)
        }
        Err(e) => {
            tracing::debug!("Failed to fetch robots.txt: {}, allowing all", e);
            RobotsPolicy::allow_all(user_agent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_allow_all() {
        let robots = RobotsPolicy::allow_all("AuditBot");
        assert!(robots.is_allowed(&url("https://example.com/any/path")));
        assert!(robots.is_allowed(&url("https://example.com/admin")));
    }

    #[test]
    fn test_disallow_all() {
        let robots = RobotsPolicy::from_content("User-agent: *\nDisallow: /", "AuditBot");
        assert!(!robots.is_allowed(&url("https://example.com/")));
        assert!(!robots.is_allowed(&url("https://example.com/page")));
    }

    #[test]
    fn test_disallow_specific_prefix() {
        let robots = RobotsPolicy::from_content("User-agent: *\nDisallow: /admin", "AuditBot");
        assert!(robots.is_allowed(&url("https://example.com/")));
        assert!(robots.is_allowed(&url("https://example.com/page")));
        assert!(!robots.is_allowed(&url("https://example.com/admin")));
        assert!(!robots.is_allowed(&url("https://example.com/admin/users")));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let robots = RobotsPolicy::from_content(
            "User-agent: *\nDisallow: /private\nAllow: /private/public",
            "AuditBot",
        );
        assert!(!robots.is_allowed(&url("https://example.com/private")));
        assert!(robots.is_allowed(&url("https://example.com/private/public")));
    }

    #[test]
    fn test_specific_user_agent_group() {
        let robots = RobotsPolicy::from_content(
            "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /",
            "AuditBot",
        );
        assert!(robots.is_allowed(&url("https://example.com/page")));

        let bad = RobotsPolicy::from_content(
            "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /",
            "BadBot",
        );
        assert!(!bad.is_allowed(&url("https://example.com/page")));
    }

    #[test]
    fn test_empty_content_allows_all() {
        let robots = RobotsPolicy::from_content("", "AuditBot");
        assert!(robots.is_allowed(&url("https://example.com/any")));
    }
}
