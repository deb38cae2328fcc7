//! reqwest-backed implementation of the [`Fetcher`] trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::error::FetchError;
use super::rate_limiter::RateLimiter;
use super::{FetchRequest, FetchResponse, Fetcher};
use crate::user_agent::BROWSER_USER_AGENT;

/// Default connect timeout. Hung connections to slow publisher sites are the
/// most common way a batch stalls.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

const MAX_REDIRECTS: usize = 10;

/// Timeout settings for [`HttpFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Maximum idle time between body reads.
    pub read_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

impl FetchSettings {
    /// Creates settings from whole-second values.
    #[must_use]
    pub fn from_secs(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            read_timeout: Duration::from_secs(read_timeout_secs),
        }
    }
}

/// HTTP fetch adapter with a browser identity and bounded timeouts.
///
/// Holds two pooled clients: one following redirects and one that stops at
/// the first response, for callers that need the pre-redirect hop.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    no_redirect_client: Client,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpFetcher {
    /// Creates a fetcher with the given timeouts and no rate limiting.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when the TLS backend or client
    /// configuration cannot be initialized.
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        Self::with_rate_limiter(settings, Arc::new(RateLimiter::disabled()))
    }

    /// Creates a fetcher that waits on `rate_limiter` before every request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when client construction fails.
    pub fn with_rate_limiter(
        settings: FetchSettings,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, FetchError> {
        let client = base_builder(settings)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(client_build_error)?;
        let no_redirect_client = base_builder(settings)
            .redirect(Policy::none())
            .build()
            .map_err(client_build_error)?;

        Ok(Self {
            client,
            no_redirect_client,
            rate_limiter,
        })
    }
}

fn base_builder(settings: FetchSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .read_timeout(settings.read_timeout)
        .user_agent(BROWSER_USER_AGENT)
        .gzip(true)
}

fn client_build_error(error: reqwest::Error) -> FetchError {
    FetchError::ClientBuild {
        reason: error.to_string(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(url = %request.url, follow = request.follow_redirects))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        Url::parse(&request.url).map_err(|_| FetchError::invalid_url(&request.url))?;

        self.rate_limiter.acquire(&request.url).await;

        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut builder = client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::from_send(&request.url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_body(&request.url, e))?
            .to_vec();

        debug!(
            status,
            final_url = %final_url,
            content_type = content_type.as_deref().unwrap_or(""),
            bytes = body.len(),
            "fetch complete"
        );

        Ok(FetchResponse {
            requested_url: request.url.clone(),
            final_url,
            status,
            content_type,
            body,
        })
    }
}
