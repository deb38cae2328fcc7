//! Error types for DOI resolution.
//!
//! Messages are persisted verbatim in the DOI failure log for manual triage.

use thiserror::Error;

use crate::fetch::FetchError;

/// Reasons a DOI could not be resolved to a landing page.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The record carried no DOI or URL; no request was made.
    #[error("No DOI or URL was available for this item")]
    NoIdentifier,

    /// The request failed before any response arrived.
    #[error("Exception raised for DOI {doi_url} : {source}")]
    Transport {
        /// DOI URL that was requested.
        doi_url: String,
        /// Underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// The redirect chain ended in a non-200 response.
    #[error("HTTP Error for DOI {doi_url} : {status}")]
    HttpStatus {
        /// DOI URL that was requested.
        doi_url: String,
        /// Final HTTP status.
        status: u16,
    },
}

impl ResolveError {
    /// Creates a transport error.
    pub fn transport(doi_url: impl Into<String>, source: FetchError) -> Self {
        Self::Transport {
            doi_url: doi_url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(doi_url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            doi_url: doi_url.into(),
            status,
        }
    }
}
