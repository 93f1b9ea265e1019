//! Small helpers over `scraper` shared by the HTML providers.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::cleaner::clean_text;
use super::error::CrawlError;

pub fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|_| CrawlError::Selector(css.to_string()))
}

/// Whitespace-normalized text of an element and its descendants.
pub fn text_of(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Text of the first match under `el`, empty when nothing matches.
pub fn first_text(el: ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel).next().map(text_of).unwrap_or_default()
}

/// Text of the last match under `el`.
pub fn last_text(el: ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel).last().map(text_of).unwrap_or_default()
}

pub fn doc_text(doc: &Html, sel: &Selector) -> String {
    doc.select(sel).next().map(text_of).unwrap_or_default()
}

pub fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve `href` against `base`; absolute links are returned as-is.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(href) {
        return Some(url.to_string());
    }
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}

/// Last non-empty path segment of a URL: ".../imovel/apto-trindade-123/" → "apto-trindade-123"
pub fn last_path_segment(url: &str) -> Option<String> {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or_default().to_string());
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}
