//! PDF file naming for search results.
//!
//! The saved PDF name is the join key between a PDF and its JSON sidecar, so
//! it must be stable across reruns of the same results file.

use sha2::{Digest, Sha256};

use super::SearchResult;

/// Sanitizes a file name to a single safe path component.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) with `_`. Names made only of
/// dots would escape the output directory, so their dots are replaced too.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }
    if sanitized.chars().all(|c| c == '.') {
        return sanitized.replace('.', "_");
    }
    sanitized
}

/// Returns the PDF file name for `record`.
///
/// Uses `saved_pdf_name` when present and meaningful; otherwise the DOI with
/// `/` replaced by `_`; otherwise a SHA-256 of the URL (or title). The result
/// always ends in `.pdf`.
#[must_use]
pub fn derive_saved_pdf_name(record: &SearchResult) -> String {
    let provided = record
        .saved_pdf_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !is_placeholder_name(name));

    let base = match provided {
        Some(name) => name.to_string(),
        None => match record.usable_doi() {
            Some(doi) => doi.replace('/', "_"),
            None => {
                let key = record
                    .url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .unwrap_or(record.title.as_str());
                hex_digest(key)
            }
        },
    };

    let name = sanitize_filename(&base);
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}

fn is_placeholder_name(name: &str) -> bool {
    let stem = name.strip_suffix(".pdf").unwrap_or(name);
    stem.is_empty() || stem.eq_ignore_ascii_case("none")
}

fn hex_digest(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
