//! Append-only failure logs.
//!
//! One plain-text log per (run label, category) under `<output_dir>/logs/`.
//! Each entry is a newline, the item's bib record as single-line JSON with
//! `failure_reason` and `failed_at` added, a newline, and a rule of 70 `=`.
//! The `logs/` directory is only created when the first failure is written.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Separator line written after every entry.
pub const ENTRY_RULE: &str = "======================================================================";

/// Subdirectory of the output directory holding logs.
pub const LOGS_DIR: &str = "logs";

/// Which log a failure goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    DoiResolution,
    PdfFetch,
}

impl FailureCategory {
    fn file_prefix(self) -> &'static str {
        match self {
            Self::DoiResolution => "failed_to_resolve_doi",
            Self::PdfFetch => "failed_to_get_pdf",
        }
    }

    /// Log file name for a run label.
    #[must_use]
    pub fn file_name(self, label: &str) -> String {
        format!("{}_{label}.txt", self.file_prefix())
    }
}

/// Errors writing or reading failure logs.
#[derive(Debug, Error)]
pub enum FailureLogError {
    #[error("IO error on failure log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode failure record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed entry {index} in failure log {path}: {source}")]
    Malformed {
        path: PathBuf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One decoded log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    /// The bib record as written, without the added fields.
    pub bib_info: Map<String, Value>,
    pub reason: String,
    /// RFC 3339 timestamp.
    pub failed_at: String,
}

/// Serializes appends per log file.
pub struct FailureLogger {
    logs_dir: PathBuf,
    label: String,
    doi_lock: Mutex<()>,
    pdf_lock: Mutex<()>,
}

impl FailureLogger {
    /// Logger writing into `<output_dir>/logs/`.
    #[must_use]
    pub fn new(output_dir: &Path, label: impl Into<String>) -> Self {
        Self {
            logs_dir: output_dir.join(LOGS_DIR),
            label: label.into(),
            doi_lock: Mutex::new(()),
            pdf_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Path of the log for `category`.
    #[must_use]
    pub fn log_path(&self, category: FailureCategory) -> PathBuf {
        self.logs_dir.join(category.file_name(&self.label))
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns [`FailureLogError`] if the directory or file cannot be written.
    pub async fn append(
        &self,
        category: FailureCategory,
        bib_info: &Value,
        reason: &str,
    ) -> Result<(), FailureLogError> {
        let entry = render_entry(bib_info, reason)?;
        let path = self.log_path(category);
        let lock = match category {
            FailureCategory::DoiResolution => &self.doi_lock,
            FailureCategory::PdfFetch => &self.pdf_lock,
        };
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.logs_dir)
            .await
            .map_err(|source| FailureLogError::Io {
                path: self.logs_dir.clone(),
                source,
            })?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| FailureLogError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(entry.as_bytes())
            .await
            .map_err(|source| FailureLogError::Io {
                path: path.clone(),
                source,
            })?;
        file.flush().await.map_err(|source| FailureLogError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), reason, "Logged failure");
        Ok(())
    }
}

fn render_entry(bib_info: &Value, reason: &str) -> Result<String, FailureLogError> {
    let mut record = match bib_info {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("record".to_string(), other.clone());
            map
        }
    };
    record.insert("failure_reason".to_string(), Value::from(reason));
    record.insert(
        "failed_at".to_string(),
        Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    let line = serde_json::to_string(&Value::Object(record))?;
    Ok(format!("\n{line}\n{ENTRY_RULE}"))
}

/// Reads back every entry of a log file. A missing file has no entries.
///
/// # Errors
///
/// Returns [`FailureLogError`] for unreadable files or entries that are not JSON objects.
pub fn read_failure_log(path: &Path) -> Result<Vec<FailureRecord>, FailureLogError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(FailureLogError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    text.split(ENTRY_RULE)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(index, chunk)| {
            let mut map: Map<String, Value> =
                serde_json::from_str(chunk).map_err(|source| FailureLogError::Malformed {
                    path: path.to_path_buf(),
                    index,
                    source,
                })?;
            let reason = take_string(&mut map, "failure_reason");
            let failed_at = take_string(&mut map, "failed_at");
            Ok(FailureRecord {
                bib_info: map,
                reason,
                failed_at,
            })
        })
        .collect()
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> String {
    match map.remove(key) {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
