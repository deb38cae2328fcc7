//! DOI resolver: follows a DOI proxy redirect chain to the publisher landing page.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{DoiTarget, ResolveError, ResolvedDoi};
use crate::fetch::{FetchRequest, Fetcher};

/// Rewrites a post-redirect URL whose host serves a generic landing page.
///
/// The landing URL is rebuilt as `target_prefix` + the last path segment of
/// the redirect target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectRewrite {
    /// Substring of the final URL that triggers the rewrite.
    pub url_fragment: &'static str,
    /// Prefix the last path segment is appended to.
    pub target_prefix: &'static str,
}

/// Known redirect quirks, checked in order.
pub const DEFAULT_REDIRECT_REWRITES: &[RedirectRewrite] = &[RedirectRewrite {
    // linkinghub.elsevier.com lands on a JavaScript interstitial.
    url_fragment: "elsevier.com/",
    target_prefix: "https://www.sciencedirect.com/science/article/pii/",
}];

impl RedirectRewrite {
    /// Applies this rewrite to `final_url` if it matches.
    #[must_use]
    pub fn apply(&self, final_url: &str) -> Option<String> {
        if !final_url.to_ascii_lowercase().contains(self.url_fragment) {
            return None;
        }
        let without_query = final_url.split(['?', '#']).next().unwrap_or(final_url);
        let last = without_query
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())?;
        Some(format!("{}{last}", self.target_prefix))
    }
}

/// Applies the first matching rewrite from `rewrites`, or returns `final_url` unchanged.
#[must_use]
pub fn apply_redirect_rewrites(final_url: &str, rewrites: &[RedirectRewrite]) -> String {
    rewrites
        .iter()
        .find_map(|rule| rule.apply(final_url))
        .unwrap_or_else(|| final_url.to_string())
}

/// Resolves DOI proxy URLs to publisher landing pages.
pub struct DoiResolver {
    fetcher: Arc<dyn Fetcher>,
    rewrites: &'static [RedirectRewrite],
}

impl std::fmt::Debug for DoiResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoiResolver")
            .field("rewrites", &self.rewrites.len())
            .finish_non_exhaustive()
    }
}

impl DoiResolver {
    /// Creates a resolver with the default redirect rewrite table.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_rewrites(fetcher, DEFAULT_REDIRECT_REWRITES)
    }

    /// Creates a resolver with a custom rewrite table.
    #[must_use]
    pub fn with_rewrites(fetcher: Arc<dyn Fetcher>, rewrites: &'static [RedirectRewrite]) -> Self {
        Self { fetcher, rewrites }
    }

    /// Follows the DOI redirect chain.
    ///
    /// [`DoiTarget::NoIdentifier`] fails immediately without touching the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when there is no identifier, the request
    /// fails, or the chain ends in a non-200 status.
    #[instrument(skip(self), fields(target = ?target))]
    pub async fn resolve(&self, target: &DoiTarget) -> Result<ResolvedDoi, ResolveError> {
        let doi_url = match target {
            DoiTarget::NoIdentifier => {
                debug!("no identifier; skipping DOI resolution");
                return Err(ResolveError::NoIdentifier);
            }
            DoiTarget::Uri(uri) => uri.as_str(),
        };

        let response = self
            .fetcher
            .fetch(&FetchRequest::get(doi_url))
            .await
            .map_err(|e| {
                warn!(doi_url, error = %e, "DOI request failed");
                ResolveError::transport(doi_url, e)
            })?;

        if !response.is_ok() {
            warn!(doi_url, status = response.status, "DOI resolved to error status");
            return Err(ResolveError::http_status(doi_url, response.status));
        }

        let landing_url = apply_redirect_rewrites(&response.final_url, self.rewrites);
        let rewritten = landing_url != response.final_url;
        info!(
            doi_url,
            landing_url = %landing_url,
            rewritten,
            "DOI resolved"
        );

        Ok(ResolvedDoi {
            doi_url: doi_url.to_string(),
            redirect_target: response.final_url,
            landing_url,
        })
    }
}
