//! Per-visit request context and the lazy frontier
//!
//! The frontier is not a central queue: each visit carries its own context,
//! and the links collected into it during extraction are drained by the
//! engine once the page is scraped. A fresh context is built for every
//! dispatch, including every redirect hop; only `source` and `redirects` are
//! copied forward explicitly by the engine.

use url::Url;

/// A candidate URL to fetch
///
/// `redirects` is zero for links discovered on a page and incremented by the
/// engine when a hop of a redirect chain is followed.
#[derive(Debug, Clone)]
pub struct Link {
    pub url: Url,
    pub redirects: u32,
}

impl Link {
    /// A link discovered on a page (not part of a redirect chain)
    pub fn discovered(url: Url) -> Self {
        Self { url, redirects: 0 }
    }
}

/// Metadata slots filled by the extractor
///
/// All values are trimmed of surrounding whitespace. Absent slots read as the
/// empty string at report time.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    pub title: Option<String>,
    pub h1: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub links: Vec<Link>,
}

impl PageMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a discovered link to the frontier slice of this context
    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn h1(&self) -> &str {
        self.h1.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn canonical(&self) -> &str {
        self.canonical.as_deref().unwrap_or_default()
    }
}

/// The metadata bag carried from dispatch through extraction to row emission
#[derive(Debug, Clone)]
pub struct VisitContext {
    /// URL to fetch
    pub url: Url,

    /// URL of the page that referred to this one; empty for the seed
    pub source: String,

    /// Redirect hops already followed to reach this URL
    pub redirects: u32,

    /// Link-chain depth from the seed (the seed sits at depth 1)
    pub depth: u32,

    /// Slots filled by the extractor after a successful fetch
    pub meta: PageMeta,
}

impl VisitContext {
    /// Context for the start URL
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            source: String::new(),
            redirects: 0,
            depth: 1,
            meta: PageMeta::new(),
        }
    }

    /// Fresh context for a link dispatched from a referring fetch
    ///
    /// `source` is the referring URL for discovered links, but the original
    /// referrer for redirect hops; the engine decides which to pass.
    pub fn child(source: String, depth: u32, link: &Link) -> Self {
        Self {
            url: link.url.clone(),
            source,
            redirects: link.redirects,
            depth,
            meta: PageMeta::new(),
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
    fn test_empty_meta_reads_as_empty_strings() {
        let meta = PageMeta::new();
        assert_eq!(meta.title(), "");
        assert_eq!(meta.h1(), "");
        assert_eq!(meta.description(), "");
        assert_eq!(meta.canonical(), "");
        assert!(meta.links.is_empty());
    }

    #[test]
    fn test_add_link_preserves_order() {
        let mut meta = PageMeta::new();
        meta.add_link(Link::discovered(url("https://example.com/a")));
        meta.add_link(Link::discovered(url("https://example.com/b")));
        let paths: Vec<&str> = meta.links.iter().map(|l| l.url.path()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_seed_context() {
        let ctx = VisitContext::seed(url("https://example.com/"));
        assert_eq!(ctx.source, "");
        assert_eq!(ctx.redirects, 0);
        assert_eq!(ctx.depth, 1);
    }

    #[test]
    fn test_child_context_copies_redirect_count() {
        let link = Link {
            url: url("https://example.com/next"),
            redirects: 3,
        };
        let ctx = VisitContext::child("https://example.com/".to_string(), 2, &link);
        assert_eq!(ctx.redirects, 3);
        assert_eq!(ctx.depth, 2);
        assert_eq!(ctx.source, "https://example.com/");
        assert!(ctx.meta.links.is_empty());
    }
}
