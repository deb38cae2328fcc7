use std::sync::Arc;

use tracing::{debug, warn};

use super::{Strategy, html, table};
use crate::download::is_pdf_content_type;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
use crate::record::NO_URL_SENTINEL;

/// A fetched landing page, kept so scrape strategies don't fetch it twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingPage {
    /// URL after redirects; relative links are joined against it.
    pub url: String,
    pub status: u16,
    pub html: String,
}

impl LandingPage {
    #[must_use]
    pub fn from_response(response: &FetchResponse) -> Self {
        Self {
            url: response.final_url.clone(),
            status: response.status,
            html: response.text().into_owned(),
        }
    }
}

/// Result of classifying a landing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub strategy: Strategy,
    /// URL the strategy operates on. For the metadata-tag case this is the
    /// advertised PDF URL rather than the landing URL.
    pub url: String,
    /// Probed landing page, when the probe succeeded and returned HTML.
    pub landing: Option<LandingPage>,
    /// The probe response itself when the landing URL served a PDF, so the
    /// body is not downloaded a second time.
    pub probed_pdf: Option<FetchResponse>,
}

/// Selects a strategy for a landing URL.
///
/// Total: every input yields a [`Dispatch`]. At most one network request is
/// made, and none for the no-URL sentinel.
pub struct PublisherClassifier {
    fetcher: Arc<dyn Fetcher>,
}

impl PublisherClassifier {
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Classifies `url` in priority order: sentinel, metadata tag, host table, generic.
    #[tracing::instrument(skip(self), fields(strategy))]
    pub async fn classify(&self, url: &str) -> Dispatch {
        let url = url.trim();
        if url.is_empty() || url.eq_ignore_ascii_case(NO_URL_SENTINEL) {
            tracing::Span::current().record("strategy", Strategy::no_url().name);
            return Dispatch {
                strategy: Strategy::no_url(),
                url: url.to_string(),
                landing: None,
                probed_pdf: None,
            };
        }

        let landing = match self.fetcher.fetch(&FetchRequest::get(url)).await {
            Ok(response) => {
                if response.is_ok()
                    && response
                        .content_type
                        .as_deref()
                        .is_some_and(is_pdf_content_type)
                {
                    debug!(final_url = %response.final_url, "Landing URL already serves a PDF");
                    tracing::Span::current().record("strategy", Strategy::direct_pdf().name);
                    return Dispatch {
                        strategy: Strategy::direct_pdf(),
                        url: url.to_string(),
                        landing: None,
                        probed_pdf: Some(response),
                    };
                }
                Some(LandingPage::from_response(&response))
            }
            Err(error) => {
                warn!(%error, "Could not probe landing page, classifying by host only");
                None
            }
        };

        let dispatch = Self::dispatch_with(url, landing);
        tracing::Span::current().record("strategy", dispatch.strategy.name);
        dispatch
    }

    /// Classification without the probe: metadata tag from `landing` (if
    /// given), then the host table, then generic. Pure.
    #[must_use]
    pub fn dispatch_with(url: &str, landing: Option<LandingPage>) -> Dispatch {
        if let Some(page) = &landing
            && let Some(meta_url) = html::citation_pdf_url(&page.html)
            && let Some(pdf_url) = html::absolutize_url(&meta_url, &page.url)
        {
            debug!(%pdf_url, "Page advertises citation_pdf_url");
            return Dispatch {
                strategy: Strategy::citation_meta(),
                url: pdf_url,
                landing,
                probed_pdf: None,
            };
        }

        let strategy = table::match_host(url).map_or_else(Strategy::generic, |rule| rule.strategy);
        Dispatch {
            strategy,
            url: url.to_string(),
            landing,
            probed_pdf: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{GENERIC_STRATEGY, StrategyKind};

    fn page(url: &str, html: &str) -> LandingPage {
        LandingPage {
            url: url.to_string(),
            status: 200,
            html: html.to_string(),
        }
    }

    #[test]
    fn test_meta_tag_beats_host_table() {
        let url = "https://bmcvetres.biomedcentral.com/articles/10.1/x";
        let landing = page(
            url,
            r#"<meta name="citation_pdf_url" content="https://x/y.pdf">"#,
        );
        let dispatch = PublisherClassifier::dispatch_with(url, Some(landing));
        assert_eq!(dispatch.strategy, Strategy::citation_meta());
        assert_eq!(dispatch.url, "https://x/y.pdf");
    }

    #[test]
    fn test_host_table_without_landing() {
        let url = "https://bmcvetres.biomedcentral.com/articles/10.1/x";
        let dispatch = PublisherClassifier::dispatch_with(url, None);
        assert_eq!(dispatch.strategy.name, "biomedcentral");
        assert_eq!(dispatch.url, url);
    }

    #[test]
    fn test_classification_is_total() {
        for url in ["", "not a url", "ftp://x", "https://example.org/a", "\u{1F600}"] {
            let dispatch = PublisherClassifier::dispatch_with(url, None);
            assert!(!dispatch.strategy.name.is_empty());
        }
        let dispatch = PublisherClassifier::dispatch_with("https://example.org/a", None);
        assert_eq!(dispatch.strategy.name, GENERIC_STRATEGY);
        assert_eq!(dispatch.strategy.kind, StrategyKind::Verbatim);
    }
}
