//! Publisher classification and PDF link strategies.
//!
//! A landing URL is mapped to exactly one [`Strategy`]: the sentinel gets
//! [`StrategyKind::NoUrl`], pages carrying a `citation_pdf_url` meta tag use it
//! verbatim, known publisher hosts use their row in [`PUBLISHER_TABLE`], and
//! everything else is fetched directly as if it already were the PDF.
//!
//! Strategies fail soft. When a rewrite or scrape cannot produce a link, the
//! original URL is used and the reason travels along as a [`StrategyMiss`] so
//! it can be reported if the download then fails.

mod classifier;
pub mod html;
mod table;

use std::fmt;

use tracing::{debug, warn};

use crate::fetch::{FetchRequest, Fetcher};
use crate::user_agent::search_engine_headers;

pub use classifier::{Dispatch, LandingPage, PublisherClassifier};
pub use table::{PUBLISHER_TABLE, PublisherRule, match_host};

/// Name of the strategy used when the page advertises its own PDF URL.
pub const CITATION_META_STRATEGY: &str = "citation_pdf_url";
/// Name of the fallback strategy for unknown hosts.
pub const GENERIC_STRATEGY: &str = "generic";
/// Name of the strategy used when the landing URL already serves a PDF.
pub const DIRECT_PDF_STRATEGY: &str = "direct_pdf";
/// Name of the no-op strategy for items without any URL.
pub const NO_URL_STRATEGY: &str = "no_url";

/// Reason given when an item reaches dispatch without a usable URL.
pub const NO_URL_REASON: &str = "No URL resolvable for this item";

/// Deterministic string edit applied to a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOp {
    /// Replace every occurrence of `from` with `to`.
    Replace {
        from: &'static str,
        to: &'static str,
    },
    /// Append a literal suffix.
    Append(&'static str),
    /// Append the path segment `from_end` places from the end, plus `suffix`.
    ///
    /// Segments are counted on the URL before this op runs, splitting on `/`,
    /// so a trailing slash makes the last segment empty.
    AppendSegment {
        from_end: usize,
        suffix: &'static str,
    },
}

impl RewriteOp {
    fn apply(self, url: &str) -> String {
        match self {
            Self::Replace { from, to } => url.replace(from, to),
            Self::Append(suffix) => format!("{url}{suffix}"),
            Self::AppendSegment { from_end, suffix } => {
                let segments: Vec<&str> = url.split('/').collect();
                let segment = segments
                    .len()
                    .checked_sub(from_end)
                    .and_then(|idx| segments.get(idx))
                    .copied()
                    .unwrap_or_default();
                format!("{url}{segment}{suffix}")
            }
        }
    }
}

/// Applies `ops` left to right. Pure: no I/O, same input gives same output.
#[must_use]
pub fn apply_rewrites(url: &str, ops: &[RewriteOp]) -> String {
    ops.iter().fold(url.to_string(), |acc, op| op.apply(&acc))
}

/// What to pull out of a landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeTarget {
    /// Attribute of the first element matching a CSS selector.
    Css {
        selector: &'static str,
        attribute: &'static str,
    },
    /// `href` of the first anchor whose text is exactly this.
    LinkText(&'static str),
    /// First anchor `href` ending with this suffix (case-insensitive).
    HrefSuffix(&'static str),
    /// Absolute target of a `window.location = "..."` script redirect.
    ScriptRedirect,
}

/// Scrape a landing page, then optionally rewrite the extracted link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlScrape {
    pub target: ScrapeTarget,
    pub then: &'static [RewriteOp],
}

/// Behavioral family of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Nothing to fetch; the item fails immediately.
    NoUrl,
    /// The URL already points at the PDF.
    Verbatim,
    /// String substitution on the URL, no network.
    PathRewrite(&'static [RewriteOp]),
    /// Parse the landing page to find the PDF link.
    HtmlScrape(HtmlScrape),
    /// URL unchanged, but the final download needs search-engine headers.
    HeaderSpoofedFetch { referer: &'static str },
}

/// A named publisher strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub kind: StrategyKind,
}

impl Strategy {
    #[must_use]
    pub const fn no_url() -> Self {
        Self {
            name: NO_URL_STRATEGY,
            kind: StrategyKind::NoUrl,
        }
    }

    #[must_use]
    pub const fn citation_meta() -> Self {
        Self {
            name: CITATION_META_STRATEGY,
            kind: StrategyKind::Verbatim,
        }
    }

    #[must_use]
    pub const fn direct_pdf() -> Self {
        Self {
            name: DIRECT_PDF_STRATEGY,
            kind: StrategyKind::Verbatim,
        }
    }

    #[must_use]
    pub const fn generic() -> Self {
        Self {
            name: GENERIC_STRATEGY,
            kind: StrategyKind::Verbatim,
        }
    }

    /// Extra headers for the final PDF download.
    #[must_use]
    pub fn download_headers(&self) -> Vec<(String, String)> {
        match self.kind {
            StrategyKind::HeaderSpoofedFetch { referer } => search_engine_headers(referer),
            _ => Vec::new(),
        }
    }

    /// Derives the direct PDF URL for `url`.
    ///
    /// `landing` is the already fetched page for `url`, if any; scrape
    /// strategies fetch it themselves otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyMiss`] when no PDF link could be derived. Use
    /// [`Strategy::resolve_link`] for the fail-soft behavior.
    pub async fn resolve_pdf_url(
        &self,
        url: &str,
        landing: Option<&LandingPage>,
        fetcher: &dyn Fetcher,
    ) -> Result<String, StrategyMiss> {
        match self.kind {
            StrategyKind::NoUrl => Err(self.miss(NO_URL_REASON)),
            StrategyKind::Verbatim | StrategyKind::HeaderSpoofedFetch { .. } => {
                Ok(url.to_string())
            }
            StrategyKind::PathRewrite(ops) => Ok(apply_rewrites(url, ops)),
            StrategyKind::HtmlScrape(scrape) => self.scrape(url, landing, fetcher, scrape).await,
        }
    }

    /// Fail-soft resolution: a miss keeps the original URL.
    ///
    /// # Errors
    ///
    /// Only [`StrategyKind::NoUrl`] fails; there is nothing to download.
    pub async fn resolve_link(
        &self,
        url: &str,
        landing: Option<&LandingPage>,
        fetcher: &dyn Fetcher,
    ) -> Result<PdfLink, StrategyMiss> {
        if self.kind == StrategyKind::NoUrl {
            return Err(self.miss(NO_URL_REASON));
        }

        let headers = self.download_headers();
        match self.resolve_pdf_url(url, landing, fetcher).await {
            Ok(pdf_url) => {
                debug!(strategy = self.name, %pdf_url, "Resolved PDF link");
                Ok(PdfLink {
                    url: pdf_url,
                    headers,
                    miss: None,
                })
            }
            Err(miss) => {
                warn!(
                    strategy = self.name,
                    url,
                    reason = %miss.reason,
                    "Strategy could not find a PDF link, using original URL"
                );
                Ok(PdfLink {
                    url: url.to_string(),
                    headers,
                    miss: Some(miss),
                })
            }
        }
    }

    async fn scrape(
        &self,
        url: &str,
        landing: Option<&LandingPage>,
        fetcher: &dyn Fetcher,
        scrape: HtmlScrape,
    ) -> Result<String, StrategyMiss> {
        let fetched;
        let page = match landing {
            Some(page) => page,
            None => {
                let response = fetcher
                    .fetch(&FetchRequest::get(url))
                    .await
                    .map_err(|e| self.miss(format!("could not fetch landing page: {e}")))?;
                fetched = LandingPage::from_response(&response);
                &fetched
            }
        };

        let raw = html::extract(&page.html, scrape.target).map_err(|reason| self.miss(reason))?;
        let absolute = html::absolutize_url(&raw, &page.url)
            .ok_or_else(|| self.miss(format!("could not make `{raw}` absolute")))?;
        Ok(apply_rewrites(&absolute, scrape.then))
    }

    fn miss(&self, reason: impl Into<String>) -> StrategyMiss {
        StrategyMiss {
            strategy: self.name,
            reason: reason.into(),
        }
    }
}

/// Why a strategy fell back to the original URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyMiss {
    pub strategy: &'static str,
    pub reason: String,
}

impl fmt::Display for StrategyMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strategy {} found no PDF link: {}", self.strategy, self.reason)
    }
}

impl std::error::Error for StrategyMiss {}

/// Where and how to download the PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLink {
    pub url: String,
    /// Header overrides for the download request.
    pub headers: Vec<(String, String)>,
    /// Set when the strategy fell back to the original URL.
    pub miss: Option<StrategyMiss>,
}
