//! HTML extraction
//!
//! Parses a fetched body once and fills the context's metadata slots, then
//! collects outbound links. Metadata is always filled before links so the
//! frontier expansion sees a complete context.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::context::{Link, PageMeta};

/// Fills a [`PageMeta`] from an HTML body
///
/// Selector table:
///
/// | selector                         | slot          |
/// |----------------------------------|---------------|
/// | `head link[rel='canonical']`     | `canonical`   |
/// | `head title`                     | `title`       |
/// | first `h1` in `body`             | `h1`          |
/// | `head meta[name='description']`  | `description` |
/// | `a[href]` with `rel != nofollow` | `links`       |
///
/// All values are trimmed. Link hrefs are resolved against `base`; targets
/// that are not plain http(s) destinations (`javascript:`, `mailto:`,
/// fragments, data URIs) are dropped.
pub fn extract(body: &str, base: &Url) -> PageMeta {
    let document = Html::parse_document(body);
    let mut meta = PageMeta::new();

    meta.canonical = select_attr(&document, "head link[rel='canonical']", "href");
    meta.title = select_text(&document, "head title");
    meta.h1 = select_text(&document, "body h1");
    meta.description = select_attr(&document, "head meta[name='description']", "content");

    // links last, once the metadata slots are complete
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if is_nofollow(&element) {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                if let Some(target) = resolve_link(href, base) {
                    meta.add_link(Link::discovered(target));
                }
            }
        }
    }

    meta
}

fn is_nofollow(element: &ElementRef) -> bool {
    element
        .value()
        .attr("rel")
        .is_some_and(|rel| rel.to_lowercase() == "nofollow")
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for hrefs that cannot become a fetchable page: empty
/// strings, fragment-only anchors, special schemes, and join failures.
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// Collapses every run of whitespace to a single space and trims the ends
///
/// Applied to text fields as they are handed to the report sink.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let meta = extract(
            r#"<html><head><title>  Test Page </title></head><body></body></html>"#,
            &base_url(),
        );
        assert_eq!(meta.title.as_deref(), Some("Test Page"));
    }

    #[test]
    fn test_extract_first_h1_only() {
        let meta = extract(
            r#"<html><body><h1>First</h1><h1>Second</h1></body></html>"#,
            &base_url(),
        );
        assert_eq!(meta.h1.as_deref(), Some("First"));
    }

    #[test]
    fn test_extract_description() {
        let meta = extract(
            r#"<html><head><meta name="description" content=" A page. "></head><body></body></html>"#,
            &base_url(),
        );
        assert_eq!(meta.description.as_deref(), Some("A page."));
    }

    #[test]
    fn test_extract_canonical() {
        let meta = extract(
            r#"<html><head><link rel="canonical" href="https://example.com/orig"></head><body></body></html>"#,
            &base_url(),
        );
        assert_eq!(meta.canonical.as_deref(), Some("https://example.com/orig"));
    }

    #[test]
    fn test_missing_slots_are_none() {
        let meta = extract(r#"<html><body>plain</body></html>"#, &base_url());
        assert!(meta.title.is_none());
        assert!(meta.h1.is_none());
        assert!(meta.description.is_none());
        assert!(meta.canonical.is_none());
    }

    #[test]
    fn test_relative_links_resolved() {
        let meta = extract(
            r#"<html><body><a href="/a">A</a><a href="b">B</a></body></html>"#,
            &base_url(),
        );
        let urls: Vec<&str> = meta.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_nofollow_links_skipped() {
        let meta = extract(
            r#"<html><body>
                <a href="/keep">K</a>
                <a href="/skip" rel="nofollow">S</a>
                <a href="/skip2" rel="NOFOLLOW">S2</a>
            </body></html>"#,
            &base_url(),
        );
        let paths: Vec<&str> = meta.links.iter().map(|l| l.url.path()).collect();
        assert_eq!(paths, vec!["/keep"]);
    }

    #[test]
    fn test_special_scheme_links_dropped() {
        let meta = extract(
            r##"<html><body>
                <a href="javascript:void(0)">J</a>
                <a href="mailto:a@b.c">M</a>
                <a href="tel:+123">T</a>
                <a href="#frag">F</a>
                <a href="">E</a>
            </body></html>"##,
            &base_url(),
        );
        assert!(meta.links.is_empty());
    }

    #[test]
    fn test_cross_host_links_kept_for_later_refusal() {
        // host filtering belongs to dispatch, not extraction
        let meta = extract(
            r#"<html><body><a href="https://other.com/x">O</a></body></html>"#,
            &base_url(),
        );
        assert_eq!(meta.links.len(), 1);
    }

    #[test]
    fn test_link_order_preserved() {
        let meta = extract(
            r#"<html><body><a href="/1">1</a><a href="/2">2</a><a href="/3">3</a></body></html>"#,
            &base_url(),
        );
        let paths: Vec<&str> = meta.links.iter().map(|l| l.url.path()).collect();
        assert_eq!(paths, vec!["/1", "/2", "/3"]);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c  "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("plain"), "plain");
    }
}
