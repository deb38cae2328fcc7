//! Landing-page HTML extraction helpers.
//!
//! Parsing happens in plain synchronous functions so `scraper::Html` (which
//! is not `Send`) never lives across an await point.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::ScrapeTarget;

/// CSS selector for the Highwire/Google Scholar citation PDF tag.
pub const CITATION_PDF_SELECTOR: &str = r#"meta[name="citation_pdf_url"]"#;

static SCRIPT_REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)window\.location\s*=\s*"([^"]+)""#)
        .unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// Returns the `content` of `<meta name="citation_pdf_url">`, if present and non-empty.
#[must_use]
pub fn citation_pdf_url(html: &str) -> Option<String> {
    extract(
        html,
        ScrapeTarget::Css {
            selector: CITATION_PDF_SELECTOR,
            attribute: "content",
        },
    )
    .ok()
}

/// Extracts the raw value described by `target` from `html`.
///
/// # Errors
///
/// Returns a human-readable reason when nothing matched; the caller turns
/// it into a strategy miss.
pub fn extract(html: &str, target: ScrapeTarget) -> Result<String, String> {
    match target {
        ScrapeTarget::Css {
            selector,
            attribute,
        } => {
            let parsed = parse_selector(selector)?;
            let document = Html::parse_document(html);
            let element = document
                .select(&parsed)
                .next()
                .ok_or_else(|| format!("no element matched `{selector}`"))?;
            element
                .value()
                .attr(attribute)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| format!("`{selector}` has no `{attribute}` attribute"))
        }
        ScrapeTarget::LinkText(text) => {
            let anchors = parse_selector("a")?;
            let document = Html::parse_document(html);
            let element = document
                .select(&anchors)
                .find(|a| a.text().collect::<String>().trim() == text)
                .ok_or_else(|| format!("no link with text `{text}`"))?;
            element
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| format!("link `{text}` has no href"))
        }
        ScrapeTarget::HrefSuffix(suffix) => {
            let anchors = parse_selector("a[href]")?;
            let document = Html::parse_document(html);
            document
                .select(&anchors)
                .filter_map(|a| a.value().attr("href"))
                .map(str::trim)
                .find(|href| href.to_ascii_lowercase().ends_with(suffix))
                .map(str::to_string)
                .ok_or_else(|| format!("no link ending in `{suffix}`"))
        }
        ScrapeTarget::ScriptRedirect => SCRIPT_REDIRECT_RE
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|target| target.contains("http"))
            .ok_or_else(|| "no absolute window.location redirect in page".to_string()),
    }
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("invalid selector `{selector}`: {e}"))
}

/// Resolves a possibly relative link against the page it was found on.
///
/// Absolute `http(s)` links are returned as-is, protocol-relative `//` links
/// get `https:`, everything else is joined onto `base_url`.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &str) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    Url::parse(base_url)
        .ok()?
        .join(value)
        .ok()
        .map(|url| url.to_string())
}
