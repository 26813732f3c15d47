//! HTML parser for extracting page text, metadata and links
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Meta description
//! - Visible body text with whitespace collapsed
//! - Links to follow (from `<a href>` tags)

use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text never counts as page content
const SKIPPED_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title, `None` when the document has no non-empty `<title>`
    pub title: Option<String>,

    /// Meta description, empty when absent
    pub description: String,

    /// Visible body text with whitespace collapsed
    pub body_text: String,

    /// All followable links on the page (absolute URLs, document order,
    /// duplicates kept)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts text, metadata and links
///
/// Parsing never fails: malformed markup degrades to no title, an empty
/// description and whatever text and links the parser recovered.
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, resolved against `<base href>`
///   when present, otherwise against `base_url`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - Fragment-only links (same page anchors)
/// - Anything that is not http(s) after resolution
///
/// # Example
///
/// ```
/// use ripple_search::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title.as_deref(), Some("Test"));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let description = extract_description(&document).unwrap_or_default();
    let body_text = extract_body_text(&document);

    let link_base = document_base(&document, base_url);
    let links = extract_links(&document, &link_base);

    ParsedPage {
        title,
        description,
        body_text,
        links,
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Reads `<meta name="description">`, then `og:description`
fn extract_description(document: &Html) -> Option<String> {
    let meta_selector = Selector::parse("meta[content]").ok()?;

    let mut og_description = None;
    for element in document.select(&meta_selector) {
        let value = element.value();
        let content = normalize_whitespace(value.attr("content").unwrap_or(""));
        if content.is_empty() {
            continue;
        }

        if value
            .attr("name")
            .is_some_and(|n| n.eq_ignore_ascii_case("description"))
        {
            return Some(content);
        }

        if og_description.is_none()
            && value
                .attr("property")
                .is_some_and(|p| p.eq_ignore_ascii_case("og:description"))
        {
            og_description = Some(content);
        }
    }

    og_description
}

fn extract_body_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    let root = body.unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    for node in root.descendants() {
        if let Node::Text(fragment) = node.value() {
            let hidden = node.ancestors().any(|ancestor| {
                matches!(ancestor.value(), Node::Element(e) if SKIPPED_TEXT_TAGS.contains(&e.name()))
            });
            if !hidden {
                text.push_str(&fragment.text);
                text.push(' ');
            }
        }
    }

    normalize_whitespace(&text)
}

/// Honors `<base href>` when it resolves to an http(s) URL
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|base| base.scheme() == "http" || base.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
