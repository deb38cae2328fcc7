//! DOI resolution.
//!
//! Turns a DOI proxy URL into the publisher landing page it redirects to,
//! applying known rewrites for hosts whose redirect target is not a usable
//! article page.

mod doi;
mod error;

pub use doi::{DEFAULT_REDIRECT_REWRITES, DoiResolver, RedirectRewrite, apply_redirect_rewrites};
pub use error::ResolveError;

/// Input to the DOI resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoiTarget {
    /// The record has nothing to resolve.
    NoIdentifier,
    /// A DOI proxy URL such as `http://dx.doi.org/10.1186/x`.
    Uri(String),
}

/// A successfully resolved DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDoi {
    /// DOI URL that was requested.
    pub doi_url: String,
    /// URL the redirect chain ended on.
    pub redirect_target: String,
    /// Landing page URL after host-specific rewrites.
    pub landing_url: String,
}
