//! Link extraction from fetched content
//!
//! HTML documents yield page links and the static assets they reference;
//! stylesheets yield their `url(...)` and `@import` references. Everything
//! else yields nothing.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Elements carrying a reference worth cloning, in one selector so matches
/// come back in document order
const LINK_SELECTOR: &str = "a[href], link[href], script[src], img[src], img[srcset], \
     iframe[src], source[src], source[srcset], video[src], audio[src], style, [style]";

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#)
            .expect("css url pattern is valid")
    })
}

fn css_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@import\s+(?:"([^"]*)"|'([^']*)')"#)
            .expect("css import pattern is valid")
    })
}

/// Returns true for HTML content types
pub fn is_html(content_type: &str) -> bool {
    let mime = mime_of(content_type);
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Returns true for stylesheet content types
pub fn is_css(content_type: &str) -> bool {
    mime_of(content_type) == "text/css"
}

fn mime_of(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Extracts outbound links from a fetched page
///
/// Relative references resolve against `base` (the URL the fetch ended on).
/// Links come back in document order with duplicates collapsed.
pub fn extract_links(content: &[u8], content_type: &str, base: &Url) -> Vec<Url> {
    let text = String::from_utf8_lossy(content);

    if is_html(content_type) {
        extract_html_links(&text, base)
    } else if is_css(content_type) {
        extract_css_links(&text, base)
    } else {
        Vec::new()
    }
}

/// Extracts links from an HTML document
pub fn extract_html_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base = document_base(&document, base);
    let mut links = LinkList::default();

    let selector = match Selector::parse(LINK_SELECTOR) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    for element in document.select(&selector) {
        collect_element_links(element, &base, &mut links);
    }

    links.into_vec()
}

/// Extracts `url(...)` and `@import` references from a stylesheet
pub fn extract_css_links(css: &str, base: &Url) -> Vec<Url> {
    let mut links = LinkList::default();
    collect_css_links(css, base, &mut links);
    links.into_vec()
}

/// Honors `<base href>` when present
fn document_base(document: &Html, fallback: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| fallback.join(href.trim()).ok())
        })
        .unwrap_or_else(|| fallback.clone())
}

fn collect_element_links(element: ElementRef<'_>, base: &Url, links: &mut LinkList) {
    let value = element.value();

    match value.name() {
        "a" | "link" => {
            if let Some(href) = value.attr("href") {
                links.push(resolve_link(href, base));
            }
        }
        "img" | "source" => {
            if let Some(src) = value.attr("src") {
                links.push(resolve_link(src, base));
            }
            if let Some(srcset) = value.attr("srcset") {
                for candidate in parse_srcset(srcset) {
                    links.push(resolve_link(candidate, base));
                }
            }
        }
        "script" | "iframe" | "video" | "audio" => {
            if let Some(src) = value.attr("src") {
                links.push(resolve_link(src, base));
            }
        }
        "style" => {
            let css: String = element.text().collect();
            collect_css_links(&css, base, links);
        }
        _ => {}
    }

    if let Some(style) = value.attr("style") {
        collect_css_links(style, base, links);
    }
}

fn collect_css_links(css: &str, base: &Url, links: &mut LinkList) {
    // Collect with offsets so imports and url() references interleave in
    // source order
    let mut found: Vec<(usize, &str)> = Vec::new();

    for re in [css_import_regex(), css_url_regex()] {
        for caps in re.captures_iter(css) {
            let reference = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3));
            if let (Some(whole), Some(reference)) = (caps.get(0), reference) {
                found.push((whole.start(), reference.as_str()));
            }
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    for (_, reference) in found {
        links.push(resolve_link(reference, base));
    }
}

/// Returns the URL part of each `srcset` candidate
fn parse_srcset(srcset: &str) -> impl Iterator<Item = &str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
}

/// Resolves a reference to an absolute HTTP(S) URL without fragment
///
/// Returns None for empty references, fragment-only anchors, `javascript:`,
/// `mailto:`, `tel:` and `data:` references, and anything that does not
/// resolve to HTTP(S).
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
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

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Ordered, duplicate-free list of links found on one page
#[derive(Default)]
struct LinkList {
    seen: HashSet<String>,
    links: Vec<Url>,
}

impl LinkList {
    fn push(&mut self, url: Option<Url>) {
        if let Some(url) = url {
            if self.seen.insert(url.as_str().to_string()) {
                self.links.push(url);
            }
        }
    }

    fn into_vec(self) -> Vec<Url> {
        self.links
    }
}
