//! HTTP fetch adapter.
//!
//! Every network call in the pipeline goes through the [`Fetcher`] trait:
//! the DOI resolver, the publisher classifier's landing-page probe, HTML
//! scraping strategies, and the final PDF download. [`HttpFetcher`] is the
//! production implementation; tests substitute their own to count or forbid
//! network calls.
//!
//! Non-2xx responses are returned as values, never as errors. Some of them
//! are meaningful (interstitial pages, publisher error pages carrying links)
//! and the caller decides what counts as failure.

mod client;
mod error;
pub mod rate_limiter;

pub use client::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, FetchSettings, HttpFetcher};
pub use error::FetchError;
pub use rate_limiter::RateLimiter;

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;

/// A single GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL to fetch.
    pub url: String,
    /// Extra headers; these override the client's default identity.
    pub headers: Vec<(String, String)>,
    /// Whether to follow redirects (default true).
    pub follow_redirects: bool,
    /// Optional total timeout for this request on top of the client timeouts.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// Creates a GET request that follows redirects and sends default headers.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            follow_redirects: true,
            timeout: None,
        }
    }

    /// Adds header overrides.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Stops at the first response instead of following redirects.
    #[must_use]
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// Sets a total timeout for this request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw response returned by a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// URL the request was issued for.
    pub requested_url: String,
    /// URL after redirects (equal to `requested_url` when none were followed).
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw `content-type` header value, if present.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Returns true for HTTP 200 exactly.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Issues GET requests on behalf of the pipeline.
///
/// Uses `async_trait` so the orchestrator can hold an `Arc<dyn Fetcher>`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs the request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] only for transport failures (invalid URL,
    /// timeout, connection errors, unreadable body). HTTP error statuses are
    /// returned inside `Ok`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_request_defaults_follow_redirects() {
        let request = FetchRequest::get("https://example.com");
        assert!(request.follow_redirects);
        assert!(request.headers.is_empty());
        assert!(request.timeout.is_none());
    }

    #[test]
    fn test_fetch_request_builders() {
        let request = FetchRequest::get("https://example.com")
            .with_headers(vec![("Referer".to_string(), "https://a".to_string())])
            .without_redirects()
            .with_timeout(Duration::from_secs(2));
        assert!(!request.follow_redirects);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_fetch_response_text_is_lossy() {
        let response = FetchResponse {
            requested_url: "https://a".to_string(),
            final_url: "https://a".to_string(),
            status: 200,
            content_type: None,
            body: vec![b'o', b'k', 0xFF],
        };
        assert!(response.is_ok());
        assert!(response.text().starts_with("ok"));
    }
}
