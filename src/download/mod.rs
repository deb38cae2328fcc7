//! PDF fetcher.
//!
//! Downloads the link a strategy produced and decides whether the response
//! really is a PDF. Every call yields a [`DownloadOutcome`] value; nothing in
//! this module returns an error.

mod outcome;

pub use outcome::{DownloadOutcome, FailureStage};

use std::sync::Arc;

use tracing::{debug, info};

use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
use crate::strategy::PdfLink;

/// True when a `content-type` value names a PDF (ASCII case-insensitive).
///
/// Publishers send `application/pdf`, `application/PDF;charset=binary`,
/// `application/x-pdf` and similar, so this is a substring check.
#[must_use]
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("pdf")
}

/// Downloads and validates PDF bytes.
pub struct PdfFetcher {
    fetcher: Arc<dyn Fetcher>,
}

impl PdfFetcher {
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetches `url` with optional header overrides.
    pub async fn fetch_pdf(&self, url: &str, headers: Vec<(String, String)>) -> DownloadOutcome {
        let request = FetchRequest::get(url).with_headers(headers);
        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(error) => {
                return DownloadOutcome::failure(
                    FailureStage::PdfValidation,
                    format!("Could not get PDF. Exception: {error}"),
                );
            }
        };
        accept_response(url, response)
    }

    /// Fetches a strategy's link. A strategy miss is appended to the failure
    /// reason so the log shows why the original URL was tried.
    pub async fn fetch_link(&self, link: &PdfLink) -> DownloadOutcome {
        let outcome = self.fetch_pdf(&link.url, link.headers.clone()).await;
        match (outcome, &link.miss) {
            (DownloadOutcome::Failure { stage, reason }, Some(miss)) => DownloadOutcome::Failure {
                stage,
                reason: format!("{reason} ({miss})"),
            },
            (outcome, _) => outcome,
        }
    }
}

/// Validates an already received response as a PDF download.
///
/// Used for probe responses that turned out to be the PDF itself.
#[must_use]
pub fn accept_response(url: &str, response: FetchResponse) -> DownloadOutcome {
    if !response.is_ok() {
        return DownloadOutcome::failure(
            FailureStage::PdfValidation,
            format!("Could not access PDF URL. HTTP Error: {}", response.status),
        );
    }

    match response.content_type {
        Some(content_type) if is_pdf_content_type(&content_type) => {
            info!(url, bytes = response.body.len(), "Downloaded PDF");
            DownloadOutcome::Success {
                bytes: response.body,
                content_type,
            }
        }
        other => {
            let shown = other.as_deref().unwrap_or("<none>");
            debug!(url, content_type = shown, "Response is not a PDF");
            DownloadOutcome::failure(
                FailureStage::PdfValidation,
                format!(
                    "No PDF content at URL. HTTP {}, content-type: {shown}",
                    response.status
                ),
            )
        }
    }
}
