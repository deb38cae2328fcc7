//! Client identities sent to publisher sites.
//!
//! Many publishers reject requests that carry a library default User-Agent, so
//! every request goes out with a browser identity. A few sites additionally
//! only serve the PDF to visitors arriving from a search engine; those get the
//! spoofed referer below.

/// Browser User-Agent sent with every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; U; Linux i686; en-US; rv:1.9.1.5) \
    Gecko/20091123 Iceweasel/3.5.5 (like Firefox/3.5.5; Debian-3.5.5-1)";

/// Referer that mimics arrival from a Google Scholar results page.
pub const SCHOLAR_REFERER: &str =
    "https://scholar.google.co.uk/scholar?hl=en&as_sdt=0%2C5&q=academic+paper&btnG=";

/// Header pairs for sites that require the request to look like it came from
/// the search engine at `referer`.
#[must_use]
pub fn search_engine_headers(referer: &str) -> Vec<(String, String)> {
    vec![
        ("User-Agent".to_string(), BROWSER_USER_AGENT.to_string()),
        ("Referer".to_string(), referer.to_string()),
    ]
}
