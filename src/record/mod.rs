//! Search result records handed to the retrieval pipeline.
//!
//! The search component writes one JSON file per query. Records are
//! immutable once loaded; the pipeline only reads them and writes them back
//! out verbatim (sidecars, failure logs).

mod filename;

pub use filename::{derive_saved_pdf_name, sanitize_filename};

use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// URL the search component stores when a result had neither link nor DOI.
pub const NO_URL_SENTINEL: &str = "http://none";

/// Key the search component writes the saved PDF name under.
const SAVED_PDF_NAME_KEY: &str = "savedPdfName";

/// Errors loading a results file.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The results file could not be read.
    #[error("failed to read results file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The results file is not valid results JSON.
    #[error("failed to parse results file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// One bibliographic record produced by a search engine.
///
/// The typed fields are a lenient view over the record as loaded. The
/// loaded JSON itself is kept in `bib` and is what sidecars and failure logs
/// receive, so keys, key styles and value types survive untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Document title; empty when absent or not a string.
    pub title: String,
    /// Author names, flattened from strings or author objects.
    pub authors: Vec<String>,
    /// DOI without resolver prefix, e.g. `10.1186/s12917-019-1`.
    pub doi: Option<String>,
    /// Landing page or DOI proxy URL.
    pub url: Option<String>,
    /// Publication year; numeric years are rendered as strings.
    pub year: Option<String>,
    /// File name for the downloaded PDF; also the stem of the JSON sidecar.
    pub saved_pdf_name: Option<String>,
    /// The record exactly as the search component wrote it.
    pub bib: Value,
}

/// Where retrieval should start for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Neither a usable DOI nor URL is present.
    NoIdentifier,
    /// A DOI proxy URL that must be followed to the publisher landing page.
    DoiUri(String),
    /// A landing page URL that can be classified directly.
    Landing(String),
}

impl SearchResult {
    /// Creates a bare record, mostly useful in tests and tooling.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let mut bib = Map::new();
        bib.insert("title".to_string(), Value::String(title.clone()));
        Self {
            title,
            authors: Vec::new(),
            doi: None,
            url: None,
            year: None,
            saved_pdf_name: None,
            bib: Value::Object(bib),
        }
    }

    /// Builds the typed view over a loaded record.
    ///
    /// Never fails: values of the wrong type are treated as absent, and a
    /// record that is not a JSON object has no identifier at all.
    #[must_use]
    pub fn from_value(bib: Value) -> Self {
        let Some(fields) = bib.as_object() else {
            warn!(record = %bib, "search result is not a JSON object");
            return Self {
                title: String::new(),
                authors: Vec::new(),
                doi: None,
                url: None,
                year: None,
                saved_pdf_name: None,
                bib,
            };
        };
        let title = string_field(fields, "title").unwrap_or_default();
        let authors = fields.get("authors").map(author_names).unwrap_or_default();
        let doi = string_field(fields, "doi");
        let url = string_field(fields, "url");
        let year = fields.get("year").and_then(year_string);
        let saved_pdf_name = string_field(fields, SAVED_PDF_NAME_KEY)
            .or_else(|| string_field(fields, "saved_pdf_name"));
        Self {
            title,
            authors,
            doi,
            url,
            year,
            saved_pdf_name,
            bib,
        }
    }

    /// Sets the DOI.
    #[must_use]
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        let doi = doi.into();
        self.set_bib_key("doi", &doi);
        self.doi = Some(doi);
        self
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.set_bib_key("url", &url);
        self.url = Some(url);
        self
    }

    /// Sets the saved PDF name, under whichever key style the record uses.
    #[must_use]
    pub fn with_saved_pdf_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let key = match &self.bib {
            Value::Object(fields) if fields.contains_key("saved_pdf_name") => "saved_pdf_name",
            _ => SAVED_PDF_NAME_KEY,
        };
        self.set_bib_key(key, &name);
        self.saved_pdf_name = Some(name);
        self
    }

    fn set_bib_key(&mut self, key: &str, value: &str) {
        if let Value::Object(fields) = &mut self.bib {
            fields.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    /// Decides where retrieval starts for this record.
    ///
    /// A URL takes precedence over the DOI field. DOI proxy URLs and bare
    /// DOIs (joined onto `doi_base_url`) both need resolution; the search
    /// component's `"None"` placeholders count as absent.
    #[must_use]
    pub fn locator(&self, doi_base_url: &str) -> Locator {
        if let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            if url.eq_ignore_ascii_case(NO_URL_SENTINEL) {
                return self.doi_locator(doi_base_url);
            }
            if is_doi_proxy_url(url) {
                return if doi_from_proxy_url(url).is_some() {
                    Locator::DoiUri(url.to_string())
                } else {
                    self.doi_locator(doi_base_url)
                };
            }
            return Locator::Landing(url.to_string());
        }
        self.doi_locator(doi_base_url)
    }

    fn doi_locator(&self, doi_base_url: &str) -> Locator {
        match self.usable_doi() {
            Some(doi) => Locator::DoiUri(format!("{}/{doi}", doi_base_url.trim_end_matches('/'))),
            None => Locator::NoIdentifier,
        }
    }

    /// The DOI if it is present and not a placeholder.
    #[must_use]
    pub fn usable_doi(&self) -> Option<&str> {
        self.doi
            .as_deref()
            .map(str::trim)
            .filter(|doi| !is_placeholder(doi))
    }

    /// The PDF file name, derived from DOI/URL/title when the record has none.
    #[must_use]
    pub fn pdf_file_name(&self) -> String {
        derive_saved_pdf_name(self)
    }

    /// The record as loaded, for sidecars and failure logs.
    #[must_use]
    pub fn to_bib_value(&self) -> Value {
        self.bib.clone()
    }
}

impl Serialize for SearchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bib.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SearchResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn author_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(author_name).collect(),
        _ => Vec::new(),
    }
}

fn author_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()).filter(|s| !s.trim().is_empty()),
        Value::Object(fields) => {
            if let Some(name) = string_field(fields, "name").or_else(|| string_field(fields, "full_name")) {
                return Some(name);
            }
            // PubMed style: {lastname, firstname, initials, affiliation}
            let parts: Vec<String> = ["firstname", "lastname"]
                .iter()
                .filter_map(|key| string_field(fields, key))
                .filter(|part| !part.trim().is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

fn year_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("null")
}

/// Returns true if `url` points at a DOI proxy (`doi.org`, `dx.doi.org`).
#[must_use]
pub fn is_doi_proxy_url(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| host == "doi.org" || host.ends_with(".doi.org"))
}

fn doi_from_proxy_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let doi = parsed.path().trim_start_matches('/');
    (!is_placeholder(doi)).then(|| doi.to_string())
}

/// Search metadata block written by the search component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Search engine name.
    #[serde(default)]
    pub source: Option<String>,
    /// Query label; namespaces failure logs.
    #[serde(default)]
    pub label: Option<String>,
    /// Query string as submitted.
    #[serde(default)]
    pub search_phrase: Option<String>,
    /// Other keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A loaded results file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsFile {
    /// Metadata block, when the file used the envelope form.
    pub metadata: Option<SearchMetadata>,
    /// Records in file order.
    pub results: Vec<SearchResult>,
}

impl ResultsFile {
    /// Parses results JSON (bare array or `{metadata, results}` envelope).
    ///
    /// Records are read one by one; a malformed record becomes an item
    /// without identifiers instead of failing the whole file.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the text is not JSON, or is neither a list
    /// nor an object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(text)? {
            Value::Array(records) => Ok(Self {
                metadata: None,
                results: records.into_iter().map(SearchResult::from_value).collect(),
            }),
            Value::Object(mut envelope) => {
                let metadata = envelope.remove("metadata").and_then(parse_metadata);
                let results = match envelope.remove("results") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(records)) => {
                        records.into_iter().map(SearchResult::from_value).collect()
                    }
                    Some(other) => {
                        return Err(de::Error::custom(format!(
                            "`results` must be a list of records, got {}",
                            json_kind(&other)
                        )));
                    }
                };
                Ok(Self { metadata, results })
            }
            other => Err(de::Error::custom(format!(
                "expected a list of results or a {{metadata, results}} object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Loads and parses a results file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the file cannot be read or parsed.
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let text = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::from_json(&text).map_err(|source| RecordError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(results = file.results.len(), "loaded results file");
        Ok(file)
    }

    /// The label stored in the metadata block, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.label.as_deref())
            .filter(|l| !l.trim().is_empty())
    }
}

fn parse_metadata(value: Value) -> Option<SearchMetadata> {
    let Value::Object(mut fields) = value else {
        warn!("ignoring results metadata that is not an object");
        return None;
    };
    let mut take = |key: &str| match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
    };
    let source = take("source");
    let label = take("label");
    let search_phrase = take("search_phrase");
    Some(SearchMetadata {
        source,
        label,
        search_phrase,
        extra: fields,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
