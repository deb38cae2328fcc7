use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::OrchestratorError;
use super::item::{ItemReport, ItemResult};
use crate::download::FailureStage;
use crate::failure::LOGS_DIR;

/// Counts for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub total: usize,
    pub written: usize,
    /// Items logged to the DOI resolution log.
    pub doi_failures: usize,
    /// Items logged to the PDF log (fetch, validation, persist).
    pub pdf_failures: usize,
    /// Items whose strategy fell back to the original URL.
    pub strategy_misses: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_reports(label: &str, reports: &[ItemReport]) -> Self {
        let mut summary = Self {
            label: label.to_string(),
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.strategy_miss.is_some() {
                summary.strategy_misses += 1;
            }
            match &report.result {
                ItemResult::Written { .. } => summary.written += 1,
                ItemResult::Logged {
                    stage: FailureStage::DoiResolution,
                    ..
                } => summary.doi_failures += 1,
                ItemResult::Logged { .. } => summary.pdf_failures += 1,
            }
        }
        summary
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.doi_failures + self.pdf_failures
    }

    /// Writes `<output_dir>/logs/summary_<label>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Summary`] on I/O or encoding failure.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf, OrchestratorError> {
        let logs_dir = output_dir.join(LOGS_DIR);
        let path = logs_dir.join(format!("summary_{}.json", self.label));
        let to_err = |source: std::io::Error| OrchestratorError::Summary {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&logs_dir).map_err(to_err)?;
        let file = fs::File::create(&path).map_err(to_err)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| to_err(std::io::Error::other(e)))?;
        Ok(path)
    }
}
