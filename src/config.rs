//! Run configuration.
//!
//! [`RunConfig`] is built once per run and passed down explicitly. Values come
//! from built-in defaults, then an optional TOML file, then CLI flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::fetch::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};
use crate::record::sanitize_filename;

/// DOI proxy used to turn bare DOIs into resolvable URLs.
pub const DEFAULT_DOI_BASE_URL: &str = "http://dx.doi.org";

/// Accepted range for the worker count.
pub const CONCURRENCY_RANGE: std::ops::RangeInclusive<usize> = 1..=16;

/// Upper bound for the per-host delay.
pub const MAX_RATE_LIMIT_MS: u64 = 60_000;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Where PDFs, sidecars, and `logs/` go.
    pub output_dir: PathBuf,
    /// Namespaces the failure logs and summary.
    pub label: String,
    pub doi_base_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Minimum delay between requests to the same host; 0 disables.
    pub rate_limit_ms: u64,
    /// Items processed at once.
    pub concurrency: usize,
    /// Write `logs/summary_<label>.json` after the batch.
    pub write_summary: bool,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            label: "results".to_string(),
            doi_base_url: DEFAULT_DOI_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            rate_limit_ms: 0,
            concurrency: 1,
            write_summary: false,
            show_progress: true,
        }
    }
}

impl RunConfig {
    /// Sets the label from free text such as a results file's metadata,
    /// replacing characters that cannot appear in a file name.
    pub fn set_label_from(&mut self, text: &str) {
        self.label = sanitize_filename(text);
    }

    /// Overlays values present in a config file.
    #[must_use]
    pub fn with_file_config(mut self, file: &FileConfig) -> Self {
        if let Some(output_dir) = &file.output_dir {
            self.output_dir.clone_from(output_dir);
        }
        if let Some(url) = &file.doi_base_url {
            self.doi_base_url.clone_from(url);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = file.read_timeout_secs {
            self.read_timeout_secs = secs;
        }
        if let Some(ms) = file.rate_limit_ms {
            self.rate_limit_ms = ms;
        }
        if let Some(concurrency) = file.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(summary) = file.write_summary {
            self.write_summary = summary;
        }
        self
    }

    /// Checks ranges and the DOI base URL.
    ///
    /// # Errors
    ///
    /// Fails with a message naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !CONCURRENCY_RANGE.contains(&self.concurrency) {
            bail!(
                "Invalid value for `concurrency`: {}. Expected range: 1..=16",
                self.concurrency
            );
        }
        if self.rate_limit_ms > MAX_RATE_LIMIT_MS {
            bail!(
                "Invalid value for `rate_limit_ms`: {}. Expected range: 0..=60000",
                self.rate_limit_ms
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        url::Url::parse(&self.doi_base_url)
            .with_context(|| format!("Invalid value for `doi_base_url`: {}", self.doi_base_url))?;
        if self.label.trim().is_empty() {
            bail!("Run label must not be empty");
        }
        // The label becomes part of the log and summary file names.
        if sanitize_filename(&self.label) != self.label {
            bail!(
                "Invalid value for `label`: {:?}. Use a plain file name, e.g. {:?}",
                self.label,
                sanitize_filename(&self.label)
            );
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: u64) -> Result<()> {
    if !(1..=3600).contains(&value) {
        bail!("Invalid value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// TOML-backed defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub doi_base_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub rate_limit_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub write_summary: Option<bool>,
}

/// Default config path: `<config dir>/grabber/config.toml`.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("grabber").join("config.toml"))
}

/// Parses a config file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid config TOML.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    Ok(toml::from_str(raw)?)
}

/// Loads `explicit` if given (it must exist), else the default path if it exists.
///
/// # Errors
///
/// Fails for a missing explicit path or an unparsable file.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return load_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        assert_eq!(config.doi_base_url, "http://dx.doi.org");
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.read_timeout_secs, 10);
        assert_eq!(config.concurrency, 1);
        assert!(!config.write_summary);
        config.validate().unwrap();
    }

    #[test]
    fn test_label_must_be_a_plain_file_name() {
        for label in ["sheep/goats", "..", " padded ", "a\\b", "what?"] {
            let config = RunConfig {
                label: label.to_string(),
                ..RunConfig::default()
            };
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("`label`"), "{label}: {err}");
        }
        let config = RunConfig {
            label: "brucellosis sheep-2019".to_string(),
            ..RunConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_label_from_free_text_is_sanitized() {
        let mut config = RunConfig::default();
        config.set_label_from("sheep/goats: AMR");
        assert_eq!(config.label, "sheep_goats_ AMR");
        config.validate().unwrap();
    }

    #[test]
    fn test_file_config_overlays_defaults() {
        let file = parse_config_str(
            r#"
            # per-user defaults
            output_dir = "/tmp/papers"
            concurrency = 4
            rate_limit_ms = 500
            write_summary = true
            "#,
        )
        .unwrap();
        let config = RunConfig::default().with_file_config(&file);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/papers"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.rate_limit_ms, 500);
        assert!(config.write_summary);
        assert_eq!(config.read_timeout_secs, 10);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(parse_config_str("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = RunConfig {
            concurrency: 0,
            ..RunConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("concurrency"), "{err}");

        let config = RunConfig {
            read_timeout_secs: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            doi_base_url: "not a url".to_string(),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_explicit_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "doi_base_url = \"https://doi.org\"\n").unwrap();
        let file = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(file.doi_base_url.as_deref(), Some("https://doi.org"));
    }
}
