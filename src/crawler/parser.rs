//! HTML parser for extracting links and page metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow, resolved to absolute URLs and limited to a scope
//! - The page title, `h1`/`h2` headings and emphasis spans

use scraper::{Html, Selector};
use url::Url;

/// Text captured from a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// Page title (if a `<title>` exists) followed by `h1`/`h2` texts
    pub titles: Vec<String>,
    pub bold_texts: Vec<String>,
    pub strong_texts: Vec<String>,
    pub em_texts: Vec<String>,
}

/// Extracts headings and emphasis text from an HTML document
///
/// All sequences keep document order. Missing elements give empty vectors.
///
/// # Example
///
/// ```
/// use scopecrawl::crawler::extract_metadata;
///
/// let html = "<html><head><title>Home</title></head><body><h1>Hi</h1><b>x</b></body></html>";
/// let meta = extract_metadata(html);
/// assert_eq!(meta.titles, vec!["Home".to_string(), "Hi".to_string()]);
/// assert_eq!(meta.bold_texts, vec!["x".to_string()]);
/// ```
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let mut titles = Vec::new();
    if let Some(title) = select_texts(&document, "title").into_iter().next() {
        titles.push(title);
    }
    titles.extend(select_texts(&document, "h1, h2"));

    PageMetadata {
        titles,
        bold_texts: select_texts(&document, "b"),
        strong_texts: select_texts(&document, "strong"),
        em_texts: select_texts(&document, "em"),
    }
}

/// Collects the trimmed text of every element matching `selector`
fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}

/// Extracts in-scope links from an HTML document
///
/// Each `<a href>` is resolved against `page_url`. A link is kept when its
/// absolute form starts with `scope`; this is a plain string-prefix test, so
/// `https://example.com/ab` is inside scope `https://example.com/a`.
/// Duplicates are kept.
///
/// # Example
///
/// ```
/// use scopecrawl::crawler::extract_links;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/docs/").unwrap();
/// let html = r#"<a href="intro">in</a><a href="https://other.org/">out</a>"#;
/// let links = extract_links(html, &page, "https://example.com");
/// assert_eq!(links, vec!["https://example.com/docs/intro".to_string()]);
/// ```
pub fn extract_links(html: &str, page_url: &Url, scope: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .filter(|absolute| absolute.starts_with(scope))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
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

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
